//! 按键绑定
//!
//! 默认映射：
//!
//! | 按键 | 动作 |
//! |------|------|
//! | `w` / `s` | 前进 / 后退 |
//! | `a` / `d` | 左移 / 右移 |
//! | `e` / `q` | 右转 / 左转 |
//! | `PageUp` / `PageDown` | 上升 / 下降 |
//! | `Space` | 悬停 |
//! | `t` | 起飞 |
//! | `Esc` | 退出 |
//!
//! 按键循环是阻塞的：一次只处理一个按键，动作按按键顺序串行执行。

use crate::action::{Action, ActionKind, Magnitudes};
use crate::dispatcher::Dispatcher;
use crate::error::InputError;
use crate::stop::StopFlag;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 按键循环的轮询间隔（用于检查停止标志）
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 逻辑按键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// 字符键（小写）；空格为 `Char(' ')`
    Char(char),
    PageUp,
    PageDown,
    Esc,
}

impl FromStr for Key {
    type Err = InputError;

    /// 接受 `w`、`space`、`page_up` / `pageup` / `page up`、`esc` / `escape`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "space" => return Ok(Key::Char(' ')),
            "page_up" | "pageup" | "pgup" => return Ok(Key::PageUp),
            "page_down" | "pagedown" | "pgdn" => return Ok(Key::PageDown),
            "esc" | "escape" => return Ok(Key::Esc),
            _ => {},
        }

        let mut chars = normalized.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_control() => Ok(Key::Char(c)),
            _ => Err(InputError::UnknownKey(s.to_string())),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(' ') => f.write_str("space"),
            Key::Char(c) => write!(f, "{}", c),
            Key::PageUp => f.write_str("page_up"),
            Key::PageDown => f.write_str("page_down"),
            Key::Esc => f.write_str("esc"),
        }
    }
}

/// 按键到动作的映射
#[derive(Debug, Clone)]
pub struct KeyBindings {
    table: HashMap<Key, ActionKind>,
    exit: Key,
    magnitudes: Magnitudes,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let table = [
            (Key::Char('w'), ActionKind::Forward),
            (Key::Char('s'), ActionKind::Back),
            (Key::Char('a'), ActionKind::Left),
            (Key::Char('d'), ActionKind::Right),
            (Key::Char('e'), ActionKind::TurnRight),
            (Key::Char('q'), ActionKind::TurnLeft),
            (Key::PageUp, ActionKind::Up),
            (Key::PageDown, ActionKind::Down),
            (Key::Char(' '), ActionKind::Hover),
            (Key::Char('t'), ActionKind::Takeoff),
        ]
        .into_iter()
        .collect();

        Self {
            table,
            exit: Key::Esc,
            magnitudes: Magnitudes::default(),
        }
    }
}

impl KeyBindings {
    pub fn with_magnitudes(mut self, magnitudes: Magnitudes) -> Self {
        self.magnitudes = magnitudes;
        self
    }

    pub fn magnitudes(&self) -> &Magnitudes {
        &self.magnitudes
    }

    /// 将动作重新绑定到 `key`（该动作原有的按键失效）
    pub fn bind(&mut self, key: Key, kind: ActionKind) -> Result<(), InputError> {
        if kind == ActionKind::Goto {
            return Err(InputError::Unbindable(kind));
        }
        if key == self.exit {
            return Err(InputError::ReservedKey(key.to_string()));
        }
        self.table.retain(|_, bound| *bound != kind);
        self.table.insert(key, kind);
        Ok(())
    }

    /// 更换退出键
    pub fn set_exit_key(&mut self, key: Key) -> Result<(), InputError> {
        if self.table.contains_key(&key) {
            return Err(InputError::ReservedKey(key.to_string()));
        }
        self.exit = key;
        Ok(())
    }

    pub fn exit_key(&self) -> Key {
        self.exit
    }

    pub fn is_exit(&self, key: Key) -> bool {
        key == self.exit
    }

    pub fn kind_for(&self, key: Key) -> Option<ActionKind> {
        self.table.get(&key).copied()
    }

    /// 按键对应的动作（带配置的幅值）
    pub fn action_for(&self, key: Key) -> Option<Action> {
        self.kind_for(key)
            .and_then(|kind| Action::from_kind(kind, &self.magnitudes))
    }

    /// 按动作顺序排列的绑定（用于帮助信息）
    pub fn entries(&self) -> Vec<(Key, ActionKind)> {
        let mut entries: Vec<_> = self.table.iter().map(|(k, a)| (*k, *a)).collect();
        entries.sort_by_key(|(_, kind)| *kind);
        entries
    }
}

/// 按键来源
pub trait KeySource {
    /// 等待下一个按键，最多 `timeout`；超时返回 `Ok(None)`
    ///
    /// 来源耗尽时返回 `InputError::Closed`。
    fn next_key(&mut self, timeout: Duration) -> Result<Option<Key>, InputError>;
}

/// 预设按键序列（测试和脚本用）
#[derive(Debug, Clone, Default)]
pub struct ScriptedKeys {
    keys: VecDeque<Key>,
}

impl ScriptedKeys {
    pub fn new(keys: impl IntoIterator<Item = Key>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.keys.len()
    }
}

impl KeySource for ScriptedKeys {
    fn next_key(&mut self, _timeout: Duration) -> Result<Option<Key>, InputError> {
        self.keys.pop_front().map(Some).ok_or(InputError::Closed)
    }
}

/// 按键循环
///
/// 直到退出键、来源关闭或停止标志被设置时返回。单个动作失败只记录错误，不结束循环。
pub fn run_bindings<K>(
    dispatcher: &mut Dispatcher,
    source: &mut K,
    bindings: &KeyBindings,
    stop: &StopFlag,
) -> Result<(), InputError>
where
    K: KeySource + ?Sized,
{
    loop {
        if stop.is_stopped() {
            dispatcher.sink().info("Stop requested, leaving keyboard control");
            return Ok(());
        }

        let key = match source.next_key(POLL_INTERVAL) {
            Ok(Some(key)) => key,
            Ok(None) => continue,
            Err(InputError::Closed) => {
                dispatcher.sink().info("Input closed, leaving keyboard control");
                return Ok(());
            },
            Err(e) => return Err(e),
        };

        if bindings.is_exit(key) {
            dispatcher.sink().info("Exit key pressed, leaving keyboard control");
            return Ok(());
        }

        let Some(action) = bindings.action_for(key) else {
            continue;
        };

        if let Err(e) = dispatcher.execute(action) {
            dispatcher.sink().error(format_args!("{}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_sink::LogSink;
    use std::sync::Arc;
    use teleop_sim::{MockSimulator, SimCommand};

    #[test]
    fn test_key_parsing() {
        assert_eq!("w".parse::<Key>().unwrap(), Key::Char('w'));
        assert_eq!("W".parse::<Key>().unwrap(), Key::Char('w'));
        assert_eq!("space".parse::<Key>().unwrap(), Key::Char(' '));
        assert_eq!("Page Up".parse::<Key>().unwrap(), Key::PageUp);
        assert_eq!("pagedown".parse::<Key>().unwrap(), Key::PageDown);
        assert_eq!("Escape".parse::<Key>().unwrap(), Key::Esc);
        assert!("f13".parse::<Key>().is_err());
        assert!("".parse::<Key>().is_err());
    }

    #[test]
    fn test_key_display_parses_back() {
        for key in [Key::Char('q'), Key::Char(' '), Key::PageUp, Key::PageDown, Key::Esc] {
            assert_eq!(key.to_string().parse::<Key>().unwrap(), key);
        }
    }

    #[test]
    fn test_default_table() {
        let bindings = KeyBindings::default();
        assert_eq!(bindings.action_for(Key::Char('w')), Some(Action::Forward(5.0)));
        assert_eq!(bindings.action_for(Key::Char('e')), Some(Action::TurnRight(5.0)));
        assert_eq!(bindings.action_for(Key::PageUp), Some(Action::Up(2.0)));
        assert_eq!(bindings.action_for(Key::Char(' ')), Some(Action::Hover));
        assert_eq!(bindings.action_for(Key::Char('x')), None);
        assert!(bindings.is_exit(Key::Esc));
        assert_eq!(bindings.entries().len(), ActionKind::BINDABLE.len());
    }

    #[test]
    fn test_rebind() {
        let mut bindings = KeyBindings::default();
        bindings.bind(Key::Char('i'), ActionKind::Forward).unwrap();
        assert_eq!(bindings.kind_for(Key::Char('i')), Some(ActionKind::Forward));
        assert_eq!(bindings.kind_for(Key::Char('w')), None);

        assert!(matches!(
            bindings.bind(Key::Char('g'), ActionKind::Goto),
            Err(InputError::Unbindable(ActionKind::Goto))
        ));
        assert!(matches!(
            bindings.bind(Key::Esc, ActionKind::Hover),
            Err(InputError::ReservedKey(_))
        ));
        assert!(bindings.set_exit_key(Key::Char('i')).is_err());
        bindings.set_exit_key(Key::Char('x')).unwrap();
        assert!(bindings.is_exit(Key::Char('x')));
    }

    #[test]
    fn test_loop_stops_at_exit_key() {
        let sim = Arc::new(MockSimulator::ready());
        let (sink, log) = LogSink::in_memory("teleop");
        let mut dispatcher = Dispatcher::new(sim.clone(), sink);
        let mut keys = ScriptedKeys::new([
            Key::Char('w'),
            Key::Char('z'),
            Key::Char('e'),
            Key::Esc,
            Key::Char('s'),
        ]);

        run_bindings(
            &mut dispatcher,
            &mut keys,
            &KeyBindings::default(),
            &StopFlag::new(),
        )
        .unwrap();

        assert_eq!(keys.remaining(), 1);
        assert_eq!(sim.velocity_commands().len(), 2);
        assert_eq!(dispatcher.heading().degrees(), 5.0);
        assert_eq!(log.count_containing("Exit key pressed"), 1);
    }

    #[test]
    fn test_loop_survives_hover_failure() {
        let sim = Arc::new(MockSimulator::new());
        let (sink, log) = LogSink::in_memory("teleop");
        let mut dispatcher = Dispatcher::new(sim.clone(), sink);
        let mut keys = ScriptedKeys::new([Key::Char(' '), Key::Char('t'), Key::Char('w')]);

        run_bindings(
            &mut dispatcher,
            &mut keys,
            &KeyBindings::default(),
            &StopFlag::new(),
        )
        .unwrap();

        assert_eq!(keys.remaining(), 0);
        assert_eq!(log.count_containing("ERROR - hover command failed"), 1);
        assert_eq!(log.count_containing("ERROR - takeoff command failed"), 1);
        assert!(sim.commands().iter().all(|c| *c != SimCommand::Hover));
    }

    #[test]
    fn test_loop_honours_stop_flag() {
        let sim = Arc::new(MockSimulator::ready());
        let (sink, _log) = LogSink::in_memory("teleop");
        let mut dispatcher = Dispatcher::new(sim.clone(), sink);
        let mut keys = ScriptedKeys::new([Key::Char('w')]);
        let stop = StopFlag::new();
        stop.stop();

        run_bindings(&mut dispatcher, &mut keys, &KeyBindings::default(), &stop).unwrap();
        assert_eq!(keys.remaining(), 1);
        assert!(sim.commands().is_empty());
    }
}
