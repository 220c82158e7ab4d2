//! 协议常量定义

use std::time::Duration;

/// 棋盘边长（15 路）
pub const BOARD_SIZE: usize = 15;

/// 连成几子获胜
pub const WIN_LENGTH: usize = 5;

/// 每方初始生命值
pub const MAX_LIFE: u8 = 3;

/// 每方初始机会（查看全盘）次数
pub const MAX_CHANCE: u8 = 2;

/// 未设置昵称时的默认昵称
pub const DEFAULT_NICKNAME: &str = "Unknown";

/// 单行命令最大字节数（不含换行符）
pub const MAX_LINE_LEN: usize = 1024;

/// 默认监听端口
pub const DEFAULT_PORT: u16 = 9999;

/// 服务端最大连接数
pub const MAX_CONNECTIONS: usize = 100;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);
