//! 终端按键来源
//!
//! 进入 raw 模式读取按键（无需回车），只处理按下事件。raw 模式下 Ctrl+C 不产生信号，
//! 因此映射为退出键。

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::time::Duration;
use teleop_control::{InputError, Key, KeySource};

pub struct TerminalKeys {
    exit: Key,
}

impl TerminalKeys {
    /// 进入 raw 模式；drop 时恢复
    pub fn new(exit: Key) -> Result<Self, InputError> {
        terminal::enable_raw_mode()?;
        Ok(Self { exit })
    }

    fn translate(&self, key: KeyEvent) -> Option<Key> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(self.exit);
        }
        match key.code {
            KeyCode::Char(c) => Some(Key::Char(c.to_ascii_lowercase())),
            KeyCode::PageUp => Some(Key::PageUp),
            KeyCode::PageDown => Some(Key::PageDown),
            KeyCode::Esc => Some(Key::Esc),
            _ => None,
        }
    }
}

impl KeySource for TerminalKeys {
    fn next_key(&mut self, timeout: Duration) -> Result<Option<Key>, InputError> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => Ok(self.translate(key)),
            _ => Ok(None),
        }
    }
}

impl Drop for TerminalKeys {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> TerminalKeys {
        // 不进入 raw 模式，只测试按键转换
        TerminalKeys { exit: Key::Esc }
    }

    #[test]
    fn test_translate() {
        let k = keys();
        let press = |code, modifiers| KeyEvent::new(code, modifiers);

        assert_eq!(
            k.translate(press(KeyCode::Char('W'), KeyModifiers::SHIFT)),
            Some(Key::Char('w'))
        );
        assert_eq!(
            k.translate(press(KeyCode::Char(' '), KeyModifiers::NONE)),
            Some(Key::Char(' '))
        );
        assert_eq!(
            k.translate(press(KeyCode::PageDown, KeyModifiers::NONE)),
            Some(Key::PageDown)
        );
        assert_eq!(
            k.translate(press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Key::Esc)
        );
        assert_eq!(k.translate(press(KeyCode::F(5), KeyModifiers::NONE)), None);
    }
}
