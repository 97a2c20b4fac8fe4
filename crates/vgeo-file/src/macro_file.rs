//! 宏文件：每行一条文本命令
//!
//! 读取时去除首尾空白并跳过空行；无法解析的行记录警告后跳过。

use crate::error::FileError;
use std::fs;
use std::path::Path;
use vgeo_core::macros::MacroCommand;

/// 解析宏文本
pub fn parse_macro(text: &str) -> Vec<MacroCommand> {
    text.lines()
        .enumerate()
        .map(|(number, line)| (number + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .filter_map(|(number, line)| match line.parse::<MacroCommand>() {
            Ok(command) => Some(command),
            Err(e) => {
                tracing::warn!("Skipping macro line {}: {} ({})", number, line, e);
                None
            }
        })
        .collect()
}

/// 每条命令一行
pub fn format_macro(commands: &[MacroCommand]) -> String {
    commands
        .iter()
        .map(|command| format!("{}\n", command))
        .collect()
}

pub fn load_macro(path: &Path) -> Result<Vec<MacroCommand>, FileError> {
    let text = fs::read_to_string(path)?;
    let commands = parse_macro(&text);
    tracing::info!("Loaded {} macro commands from {}", commands.len(), path.display());
    Ok(commands)
}

/// 保存宏文件，自动创建父目录并覆盖已有文件
pub fn save_macro(commands: &[MacroCommand], path: &Path) -> Result<(), FileError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format_macro(commands))?;
    tracing::info!("Saved {} macro commands to {}", commands.len(), path.display());
    Ok(())
}
