//! 交互模式（键盘遥控）
//!
//! 连接后启动遥测线程和按键循环，直到按下退出键或收到 Ctrl+C。

use anyhow::{Context, Result};
use teleop_control::{KeyBindings, Session};

use crate::config::CliConfig;
use crate::input::TerminalKeys;
use crate::modes::oneshot::{connect_backend, describe_backend, open_log};

fn print_bindings(bindings: &KeyBindings) {
    println!("按键绑定:");
    for (key, kind) in bindings.entries() {
        println!("  {:<10} {}", key.to_string(), kind.label());
    }
    println!("  {:<10} 退出", bindings.exit_key().to_string());
}

pub fn run(config: &CliConfig) -> Result<()> {
    let session_config = config.session()?;
    let exit = session_config.bindings.exit_key();
    print_bindings(&session_config.bindings);

    let (sink, _guard) = open_log(config)?;
    println!("⏳ 连接到模拟器（{}）...", describe_backend(config));
    let sim = connect_backend(config, &session_config, &sink)?;
    println!("✅ 已连接，日志写入 {}", config.log.file.display());

    let session = Session::new(sim, sink, session_config);
    let stop = session.stop_flag();
    ctrlc::set_handler(move || stop.stop()).context("设置 Ctrl+C 处理器失败")?;

    let keys = TerminalKeys::new(exit).context("无法进入终端 raw 模式")?;
    let report = session.run(keys)?;

    println!(
        "🛑 会话结束：发出 {} 条指令，拒绝 {}，失败 {}，最终航向 {}",
        report.dispatch.issued,
        report.dispatch.rejected,
        report.dispatch.propagated,
        report.final_heading
    );
    Ok(())
}
