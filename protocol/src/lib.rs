//! 五子棋（Omok）共享协议库
//!
//! 包含:
//! - 棋子颜色、坐标、棋盘等核心数据结构
//! - 五连判定与黑方禁手判定（长连、双三、双四）
//! - 消息类型定义 (ClientMessage, ServerMessage) 及按行文本编解码
//! - 传输层抽象 (Connector, Connection, Listener traits)

mod board;
mod constants;
mod error;
mod forbidden;
mod message;
mod stone;
mod transport;
mod win;

pub use board::{Board, AXES};
pub use constants::*;
pub use error::{ProtocolError, Result};
pub use forbidden::{ForbiddenEvaluator, ForbiddenKind, ForbiddenSet};
pub use message::{ClientMessage, ErrorCode, RoomSummary, ServerMessage};
pub use stone::{Position, Stone};
pub use transport::{
    Connection, Connector, Listener,
    TcpConnection, TcpConnector, TcpListener,
    LineReader, LineWriter,
};
pub use win::WinDetector;
