//! 五子棋（Omok）服务端
//!
//! 包含:
//! - 对局控制（落子校验、生命值、机会、禁手广播）
//! - 房间系统与按名称索引的房间注册表
//! - 会话管理与按行文本协议的连接处理
//! - 服务端配置

pub mod config;
pub mod game;
pub mod registry;
pub mod room;
pub mod server;
pub mod session;

pub use config::ServerConfig;
pub use game::{Game, Outbox, PlaceOutcome};
pub use registry::{RoomRegistry, SharedRoom};
pub use room::{Occupant, Room, RoomState};
pub use server::{serve_connection, MessageHandler, Server, ServerState};
pub use session::{Session, SessionHandle, SessionId};
