//! 服务端配置
//!
//! 加载顺序（后者覆盖前者）：
//! 默认值 -> JSON 配置文件 -> 环境变量 `OMOK_HOST` / `OMOK_PORT` -> 命令行端口参数。

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use protocol::{DEFAULT_PORT, MAX_CONNECTIONS};

/// 监听地址环境变量
pub const ENV_HOST: &str = "OMOK_HOST";
/// 监听端口环境变量
pub const ENV_PORT: &str = "OMOK_PORT";

/// 服务端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 最大同时连接数
    pub max_connections: usize,
    /// 空闲超时（秒），未设置则不超时
    pub idle_timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_connections: MAX_CONNECTIONS,
            idle_timeout_secs: None,
        }
    }
}

impl ServerConfig {
    /// 默认配置文件路径
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("omok-server");
            path.push("server.json");
            path
        })
    }

    /// 从 JSON 文件加载（缺省字段取默认值）
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        Ok(config)
    }

    /// 按完整顺序加载配置。
    ///
    /// `args` 为去掉程序名后的命令行参数：`[--config <path>] [port]`。
    pub fn load(args: &[String]) -> Result<Self> {
        let mut config_path = None;
        let mut port_arg = None;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    let path = iter.next().context("--config 需要一个路径参数")?;
                    config_path = Some(PathBuf::from(path));
                }
                other => {
                    let port = other
                        .parse::<u16>()
                        .with_context(|| format!("无效的端口号: {}", other))?;
                    port_arg = Some(port);
                }
            }
        }

        let mut config = match config_path {
            Some(path) => Self::from_file(&path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => {
                    info!("使用配置文件 {}", path.display());
                    Self::from_file(&path)?
                }
                _ => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        if let Some(port) = port_arg {
            config.port = port;
        }

        config.validate()?;
        Ok(config)
    }

    /// 用环境变量覆盖（`lookup` 便于测试时注入）
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("{} 不是有效的端口号: {}", ENV_PORT, port))?;
        }
        Ok(())
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.host.trim().is_empty(), "监听地址不能为空");
        ensure!(self.max_connections > 0, "max_connections 必须大于 0");
        ensure!(self.idle_timeout_secs != Some(0), "idle_timeout_secs 必须大于 0");
        Ok(())
    }

    /// 监听地址（host:port）
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }
}
