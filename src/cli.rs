//! 命令行参数
//! 仅支持 `--server.port=<端口>`、`--server.address=<地址>`、`--version`、`--help`

use thiserror::Error;

/// 允许通过命令行覆盖的配置键
const OVERRIDABLE_KEYS: &[&str] = &["server.port", "server.address"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 启动服务，携带配置覆盖项
    Run(Vec<(String, String)>),
    Version,
    Help,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("Unknown argument: {0}")]
    UnknownArgument(String),

    #[error("Missing value for {0}, expected {0}=<value>")]
    MissingValue(String),
}

/// 解析命令行参数（不含程序名）
pub fn parse_args<I, S>(args: I) -> Result<Command, CliError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut overrides: Vec<(String, String)> = Vec::new();

    for arg in args {
        let arg = arg.as_ref();
        match arg {
            "--version" => return Ok(Command::Version),
            "--help" | "-h" => return Ok(Command::Help),
            _ => {}
        }

        let flag = arg
            .strip_prefix("--")
            .ok_or_else(|| CliError::UnknownArgument(arg.to_string()))?;

        let (key, value) = match flag.split_once('=') {
            Some((key, value)) => (key, value.trim()),
            None if OVERRIDABLE_KEYS.contains(&flag) => {
                return Err(CliError::MissingValue(arg.to_string()))
            }
            None => return Err(CliError::UnknownArgument(arg.to_string())),
        };

        if !OVERRIDABLE_KEYS.contains(&key) {
            return Err(CliError::UnknownArgument(arg.to_string()));
        }
        if value.is_empty() {
            return Err(CliError::MissingValue(format!("--{}", key)));
        }

        // 后出现的同名参数覆盖先前的值
        overrides.retain(|(existing, _)| existing != key);
        overrides.push((key.to_string(), value.to_string()));
    }

    Ok(Command::Run(overrides))
}

/// 打印帮助信息
pub fn print_help() {
    println!("netflix-dashboard {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("用法: netflix-dashboard [选项]");
    println!();
    println!("选项:");
    println!("  --server.port=<端口>       监听端口（默认 8501）");
    println!("  --server.address=<地址>    监听地址（默认 0.0.0.0）");
    println!("  --version                  打印版本信息并退出");
    println!("  --help                     打印此帮助信息并退出");
    println!();
    println!("环境变量:");
    println!("  其余配置通过 DASHBOARD_ 前缀的环境变量完成，例如 DASHBOARD_DATABASE__URL");
}
