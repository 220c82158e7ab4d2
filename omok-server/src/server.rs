//! 服务器主逻辑

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use protocol::{
    ClientMessage, Connection, ErrorCode, LineReader, Listener, ProtocolError, ServerMessage,
    TcpConnection, TcpListener,
};

use crate::config::ServerConfig;
use crate::registry::RoomRegistry;
use crate::session::{Session, SessionId};

/// 服务器状态（所有连接共享）
pub struct ServerState {
    pub registry: RoomRegistry,
    next_session_id: AtomicU64,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            registry: RoomRegistry::new(),
            next_session_id: AtomicU64::new(1),
        }
    }

    /// 生成新的会话 ID
    pub fn next_session_id(&self) -> SessionId {
        self.next_session_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// TCP 服务器
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    state: Arc<ServerState>,
    /// 连接数上限
    limiter: Arc<Semaphore>,
}

impl Server {
    /// 绑定监听地址
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("无法监听 {}", addr))?;

        Ok(Self {
            listener,
            limiter: Arc::new(Semaphore::new(config.max_connections)),
            config,
            state: Arc::new(ServerState::new()),
        })
    }

    /// 实际监听地址（端口为 0 时由系统分配）
    pub fn local_addr(&self) -> Option<String> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// 接受连接循环，每个连接一个任务
    pub async fn run(mut self) -> Result<()> {
        info!(
            "服务器监听于 {}，最大连接数 {}",
            self.local_addr().unwrap_or_else(|| self.config.bind_addr()),
            self.config.max_connections
        );

        loop {
            // 达到上限时等待已有连接释放
            let permit = Arc::clone(&self.limiter).acquire_owned().await?;
            let conn = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("接受连接失败: {}", e);
                    continue;
                }
            };

            let state = Arc::clone(&self.state);
            let idle_timeout = self.config.idle_timeout();
            tokio::spawn(async move {
                if let Err(e) = serve_connection(state, conn, idle_timeout).await {
                    warn!("连接异常结束: {:#}", e);
                }
                drop(permit);
            });
        }
    }
}

/// 处理单个连接直到断开。
///
/// 读循环在当前任务中执行；发往该连接的消息经由通道交给独立的写任务，
/// 因此房间可以在持锁时广播而不会被慢连接阻塞。
pub async fn serve_connection(
    state: Arc<ServerState>,
    conn: TcpConnection,
    idle_timeout: Option<Duration>,
) -> Result<()> {
    let peer = conn.peer_addr().unwrap_or_else(|| "unknown".to_string());
    let (mut reader, mut writer) = conn.split();
    let (mut session, mut rx) = Session::new(state.next_session_id());
    let session_id = session.id();
    info!("客户端已连接: #{} {}", session_id, peer);

    let writer_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            debug!("[SEND #{}] {}", session_id, msg);
            if let Err(e) = writer.send(&msg).await {
                warn!("发送失败 #{}: {}", session_id, e);
                break;
            }
        }
        if let Err(e) = writer.shutdown().await {
            debug!("关闭写端失败 #{}: {}", session_id, e);
        }
    });

    let result = read_loop(&state, &mut session, &mut reader, idle_timeout).await;

    MessageHandler::handle_disconnect(&state, &mut session).await;
    // 释放发送端，写任务发完剩余消息后退出
    drop(session);
    if let Err(e) = writer_task.await {
        warn!("写任务异常退出 #{}: {}", session_id, e);
    }

    info!("客户端已断开: #{} {}", session_id, peer);
    result
}

async fn read_loop(
    state: &ServerState,
    session: &mut Session,
    reader: &mut LineReader<OwnedReadHalf>,
    idle_timeout: Option<Duration>,
) -> Result<()> {
    loop {
        let next = match idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, reader.read_line()).await {
                Ok(next) => next,
                Err(_) => {
                    info!("会话 #{} 空闲超时", session.id());
                    return Ok(());
                }
            },
            None => reader.read_line().await,
        };

        let line = match next {
            Ok(line) => line,
            Err(ProtocolError::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        debug!("[RECV #{} {}] {}", session.id(), session.nickname(), line);

        match line.parse::<ClientMessage>() {
            Ok(msg) => MessageHandler::handle(state, session, msg).await,
            Err(code) => session.send(code.into()),
        }
    }
}

/// 消息处理器
pub struct MessageHandler;

impl MessageHandler {
    /// 处理客户端消息。
    ///
    /// 大厅命令只在对局外有效，对局命令只在对局中有效，其余一律 UnknownCommand。
    pub async fn handle(state: &ServerState, session: &mut Session, msg: ClientMessage) {
        if msg.is_lobby() == session.is_in_game() {
            session.send(ErrorCode::UnknownCommand.into());
            return;
        }

        match msg {
            ClientMessage::Nick { nickname } => Self::handle_nick(session, nickname),
            ClientMessage::RoomList => Self::handle_room_list(state, session).await,
            ClientMessage::CreateRoom { name } => {
                Self::handle_create_room(state, session, name).await
            }
            ClientMessage::JoinRoom { name } => Self::handle_join_room(state, session, name).await,
            ClientMessage::Place { row, col } => Self::handle_place(session, row, col).await,
            ClientMessage::UseChance => Self::handle_use_chance(session).await,
            ClientMessage::Reset => Self::handle_reset(session).await,
            ClientMessage::End => Self::handle_end(state, session).await,
        }
    }

    /// 连接断开：离开所在房间
    pub async fn handle_disconnect(state: &ServerState, session: &mut Session) {
        if let Some(room) = session.current_room() {
            state.registry.leave_room(&room, session.id()).await;
        }
        session.clear_room();
    }

    fn handle_nick(session: &mut Session, nickname: String) {
        info!("会话 #{} 设置昵称: {}", session.id(), nickname);
        session.set_nickname(nickname);
        session.send(ServerMessage::NickOk);
    }

    async fn handle_room_list(state: &ServerState, session: &Session) {
        let rooms = state.registry.list_rooms().await;
        session.send(ServerMessage::RoomList { rooms });
    }

    /// 创建房间；若此前独自在另一个房间等待，则新房间创建成功后离开旧房间
    async fn handle_create_room(state: &ServerState, session: &mut Session, name: String) {
        let previous = session.current_room();
        match state.registry.create_room(&name, session.occupant()).await {
            Ok(room) => {
                session.enter_room(&room);
                if let Some(previous) = previous {
                    state.registry.leave_room(&previous, session.id()).await;
                }
            }
            Err(code) => session.send(code.into()),
        }
    }

    async fn handle_join_room(state: &ServerState, session: &mut Session, name: String) {
        let previous = session.current_room();
        match state.registry.join_room(&name, session.occupant()).await {
            Ok(room) => {
                session.enter_room(&room);
                if let Some(previous) = previous {
                    state.registry.leave_room(&previous, session.id()).await;
                }
            }
            Err(code) => session.send(code.into()),
        }
    }

    async fn handle_place(session: &Session, row: i32, col: i32) {
        let Some(room) = session.current_room() else {
            session.send(ErrorCode::UnknownCommand.into());
            return;
        };

        let result = room.lock().await.handle_place(session.id(), row, col);
        if let Err(code) = result {
            debug!("会话 #{} 落子 ({}, {}) 被拒绝: {}", session.id(), row, col, code);
            session.send(code.into());
        }
    }

    async fn handle_use_chance(session: &Session) {
        let Some(room) = session.current_room() else {
            session.send(ErrorCode::UnknownCommand.into());
            return;
        };

        let result = room.lock().await.handle_chance(session.id());
        if let Err(code) = result {
            session.send(code.into());
        }
    }

    async fn handle_reset(session: &Session) {
        let Some(room) = session.current_room() else {
            session.send(ErrorCode::UnknownCommand.into());
            return;
        };

        let result = room.lock().await.reset(session.id());
        if let Err(code) = result {
            session.send(code.into());
        }
    }

    async fn handle_end(state: &ServerState, session: &mut Session) {
        let Some(room) = session.current_room() else {
            session.send(ErrorCode::UnknownCommand.into());
            return;
        };

        state.registry.end_room(&room).await;
        session.clear_room();
    }
}
