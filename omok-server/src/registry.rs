//! 房间注册表
//!
//! 按名称索引所有房间。加锁顺序固定为先注册表、后房间，
//! 离开与结束都在注册表锁内完成，避免移除空房间与加入房间之间的竞争。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use protocol::{ErrorCode, RoomSummary, ServerMessage};

use crate::room::{Occupant, Room};
use crate::session::SessionId;

/// 共享的房间
pub type SharedRoom = Arc<Mutex<Room>>;

/// 房间注册表
pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, SharedRoom>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// 创建房间并让创建者入座（执黑）。
    ///
    /// 创建者依次收到 ROOMCREATED 与 JOINED。
    pub async fn create_room(&self, name: &str, host: Occupant) -> Result<SharedRoom, ErrorCode> {
        let mut rooms = self.rooms.lock().await;
        if rooms.contains_key(name) {
            return Err(ErrorCode::RoomExists);
        }

        let mut room = Room::new(name);
        host.handle.send(ServerMessage::RoomCreated {
            name: name.to_string(),
        });
        room.add_occupant(host);

        let shared = Arc::new(Mutex::new(room));
        rooms.insert(name.to_string(), Arc::clone(&shared));
        info!("创建房间 {}，当前房间数 {}", name, rooms.len());

        Ok(shared)
    }

    /// 加入房间；人数到齐后立即开始对局
    pub async fn join_room(&self, name: &str, occupant: Occupant) -> Result<SharedRoom, ErrorCode> {
        let rooms = self.rooms.lock().await;
        let shared = rooms.get(name).cloned().ok_or(ErrorCode::NoSuchRoom)?;

        let mut room = shared.lock().await;
        if room.add_occupant(occupant).is_none() {
            return Err(ErrorCode::RoomFull);
        }
        if room.is_full() {
            room.start_game();
        }
        drop(room);

        Ok(shared)
    }

    /// 所有房间的摘要，按名称排序
    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        let rooms = self.rooms.lock().await;
        let mut summaries = Vec::with_capacity(rooms.len());
        for room in rooms.values() {
            summaries.push(room.lock().await.summary());
        }
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    /// 会话离开房间；房间空了则关闭并移除
    pub async fn leave_room(&self, room: &SharedRoom, id: SessionId) {
        let mut rooms = self.rooms.lock().await;
        let mut guard = room.lock().await;
        guard.remove_occupant(id);

        if guard.is_empty() {
            guard.close();
            let name = guard.name().to_string();
            drop(guard);
            Self::remove_entry(&mut rooms, &name, room);
        }
    }

    /// 结束房间（END）：通知所有人并移除
    pub async fn end_room(&self, room: &SharedRoom) {
        let mut rooms = self.rooms.lock().await;
        let mut guard = room.lock().await;
        guard.end_game();
        let name = guard.name().to_string();
        drop(guard);
        Self::remove_entry(&mut rooms, &name, room);
    }

    /// 按名称移除房间（不存在时无效果）
    pub async fn remove_room(&self, name: &str) -> bool {
        let removed = self.rooms.lock().await.remove(name);
        match removed {
            Some(room) => {
                room.lock().await.close();
                info!("移除房间 {}", name);
                true
            }
            None => false,
        }
    }

    /// 仅当名称仍指向同一个房间时才移除（名称可能已被新房间复用）
    fn remove_entry(rooms: &mut HashMap<String, SharedRoom>, name: &str, room: &SharedRoom) {
        if rooms.get(name).is_some_and(|r| Arc::ptr_eq(r, room)) {
            rooms.remove(name);
            info!("移除房间 {}，当前房间数 {}", name, rooms.len());
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
