//! 会话管理
//!
//! 每个 TCP 连接对应一个 [`Session`]，由该连接的读循环独占。
//! 房间只持有 [`SessionHandle`]（发送通道 + 对局标记），不持有连接本身；
//! 会话对房间也只保留弱引用。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, Mutex};

use protocol::{ServerMessage, DEFAULT_NICKNAME};

use crate::room::{Occupant, Room};

/// 会话 ID
pub type SessionId = u64;

/// 会话对外共享的部分
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    /// 发往该连接写任务的消息通道
    tx: mpsc::UnboundedSender<ServerMessage>,
    /// 是否处于对局中（决定命令路由到大厅还是房间）
    in_game: AtomicBool,
}

impl SessionHandle {
    pub fn new(id: SessionId, tx: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            id,
            tx,
            in_game: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// 发送消息；连接已关闭时返回 false
    pub fn send(&self, msg: ServerMessage) -> bool {
        self.tx.send(msg).is_ok()
    }

    pub fn is_in_game(&self) -> bool {
        self.in_game.load(Ordering::SeqCst)
    }

    pub fn set_in_game(&self, in_game: bool) {
        self.in_game.store(in_game, Ordering::SeqCst);
    }
}

/// 一个连接的会话状态
pub struct Session {
    handle: Arc<SessionHandle>,
    nickname: String,
    /// 当前所在房间（弱引用，不拥有房间）
    room: Option<Weak<Mutex<Room>>>,
}

impl Session {
    /// 创建会话，返回会话与其出站消息接收端
    pub fn new(id: SessionId) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Self {
            handle: Arc::new(SessionHandle::new(id, tx)),
            nickname: DEFAULT_NICKNAME.to_string(),
            room: None,
        };
        (session, rx)
    }

    pub fn id(&self) -> SessionId {
        self.handle.id()
    }

    pub fn handle(&self) -> &Arc<SessionHandle> {
        &self.handle
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn set_nickname(&mut self, nickname: String) {
        self.nickname = nickname;
    }

    pub fn send(&self, msg: ServerMessage) {
        self.handle.send(msg);
    }

    /// 以当前昵称生成入座信息
    pub fn occupant(&self) -> Occupant {
        Occupant::new(Arc::clone(&self.handle), self.nickname.clone())
    }

    /// 当前房间（房间已销毁则为 None）
    pub fn current_room(&self) -> Option<Arc<Mutex<Room>>> {
        self.room.as_ref()?.upgrade()
    }

    pub fn enter_room(&mut self, room: &Arc<Mutex<Room>>) {
        self.room = Some(Arc::downgrade(room));
    }

    pub fn clear_room(&mut self) {
        self.room = None;
    }

    /// 对局中：标记已设置且房间仍然存在
    pub fn is_in_game(&self) -> bool {
        self.handle.is_in_game() && self.current_room().is_some()
    }
}
