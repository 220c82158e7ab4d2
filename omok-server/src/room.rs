//! 房间系统
//!
//! 房间最多容纳两人：座位 0 执黑，座位 1 执白。
//! 房间内所有广播都在持有房间锁时发出，保证两位玩家看到相同的消息顺序。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use protocol::{ErrorCode, RoomSummary, ServerMessage, Stone};

use crate::game::{Game, Outbox, PlaceOutcome};
use crate::session::{SessionHandle, SessionId};

/// 房间容量
pub const ROOM_CAPACITY: usize = 2;

/// 房间中的一位玩家
#[derive(Debug, Clone)]
pub struct Occupant {
    pub handle: Arc<SessionHandle>,
    pub nickname: String,
}

impl Occupant {
    pub fn new(handle: Arc<SessionHandle>, nickname: String) -> Self {
        Self { handle, nickname }
    }

    pub fn id(&self) -> SessionId {
        self.handle.id()
    }
}

/// 房间状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    /// 等待对手
    Waiting,
    /// 对局中
    Playing,
    /// 已分出胜负，等待 RESET 或 END
    Over,
    /// 已关闭，不再接受任何操作
    Closed,
}

/// 房间
pub struct Room {
    name: String,
    /// 按座位顺序排列
    occupants: Vec<Occupant>,
    /// 当前对局；两人到齐后创建，有人离开即丢弃
    game: Option<Game>,
    closed: bool,
    created_at: Instant,
}

impl Room {
    /// 创建新房间
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            occupants: Vec::with_capacity(ROOM_CAPACITY),
            game: None,
            closed: false,
            created_at: Instant::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> RoomState {
        match &self.game {
            _ if self.closed => RoomState::Closed,
            Some(game) if game.is_over() => RoomState::Over,
            Some(_) => RoomState::Playing,
            None => RoomState::Waiting,
        }
    }

    pub fn game(&self) -> Option<&Game> {
        self.game.as_ref()
    }

    pub fn occupant_count(&self) -> usize {
        self.occupants.len()
    }

    pub fn is_full(&self) -> bool {
        self.occupants.len() >= ROOM_CAPACITY
    }

    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// 房间已存在的时长
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// 检查会话是否在房间中
    pub fn has_session(&self, id: SessionId) -> bool {
        self.occupants.iter().any(|o| o.id() == id)
    }

    /// 获取会话执子颜色（由座位决定）
    pub fn stone_of(&self, id: SessionId) -> Option<Stone> {
        let seat = self.occupants.iter().position(|o| o.id() == id)?;
        Stone::from_seat(seat)
    }

    /// 获取房间信息（用于列表展示）
    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            name: self.name.clone(),
            occupants: self.occupants.len(),
        }
    }

    /// 添加玩家，只向新加入者发送 JOINED。
    ///
    /// 房间已满、已关闭或会话已在房间中时返回 `None`。
    pub fn add_occupant(&mut self, occupant: Occupant) -> Option<Stone> {
        if self.closed || self.is_full() || self.has_session(occupant.id()) {
            return None;
        }

        let stone = Stone::from_seat(self.occupants.len())?;
        info!(
            "玩家 {} (#{}) 进入房间 {}，执 {}",
            occupant.nickname,
            occupant.id(),
            self.name,
            stone
        );
        occupant.handle.send(ServerMessage::Joined {
            name: self.name.clone(),
            stone,
        });
        self.occupants.push(occupant);
        Some(stone)
    }

    /// 开始新对局：START（各自颜色）、TURN B，以及初始禁手点
    pub fn start_game(&mut self) {
        if self.closed || !self.is_full() {
            return;
        }

        let game = Game::new();
        for (seat, o) in self.occupants.iter().enumerate() {
            if let Some(stone) = Stone::from_seat(seat) {
                o.handle.set_in_game(true);
                o.handle.send(ServerMessage::Start { stone });
            }
        }

        let mut out = vec![ServerMessage::Turn { stone: game.turn() }];
        game.announce_forbidden(&mut out);
        self.game = Some(game);
        self.flush(out);

        info!("房间 {} 开始对局", self.name);
    }

    /// 移除玩家。
    ///
    /// 对局进行中时丢弃对局，向留下的玩家发送 OPPONENT_LEFT；
    /// 留下的玩家移到座位 0，下一位加入者开始新对局。
    ///
    /// 对局标记只在本房间确有对局时清除：离开者可能已在另一个房间开局。
    pub fn remove_occupant(&mut self, id: SessionId) -> Option<Stone> {
        let seat = self.occupants.iter().position(|o| o.id() == id)?;
        let left = self.occupants.remove(seat);
        info!("玩家 {} (#{}) 离开房间 {}", left.nickname, left.id(), self.name);

        if self.game.take().is_some() {
            left.handle.set_in_game(false);
            for o in &self.occupants {
                o.handle.set_in_game(false);
                o.handle.send(ServerMessage::OpponentLeft);
            }
        }

        Stone::from_seat(seat)
    }

    /// 处理落子请求；失败时错误只回复给请求方
    pub fn handle_place(
        &mut self,
        id: SessionId,
        row: i32,
        col: i32,
    ) -> Result<PlaceOutcome, ErrorCode> {
        let stone = self.stone_of(id).ok_or(ErrorCode::UnknownCommand)?;
        let game = self.active_game()?;

        let mut out = Outbox::new();
        let outcome = game.place(stone, row, col, &mut out)?;
        debug!("房间 {} {} 落子 ({}, {}) -> {:?}", self.name, stone, row, col, outcome);

        if outcome == PlaceOutcome::Won {
            info!("房间 {} 对局结束，{} 胜", self.name, stone);
        }
        self.flush(out);
        Ok(outcome)
    }

    /// 处理使用机会请求。
    ///
    /// 次数已用完时只向请求方回复当前次数（0），不广播。
    pub fn handle_chance(&mut self, id: SessionId) -> Result<(), ErrorCode> {
        let stone = self.stone_of(id).ok_or(ErrorCode::UnknownCommand)?;
        let game = self.active_game()?;

        let mut out = Outbox::new();
        match game.use_chance(stone, &mut out)? {
            Some(_) => self.flush(out),
            None => {
                if let Some(o) = self.occupants.iter().find(|o| o.id() == id) {
                    o.handle.send(ServerMessage::Chances { stone, chances: 0 });
                }
            }
        }
        Ok(())
    }

    /// 重置对局（任一方均可发起，包括分出胜负之后）
    pub fn reset(&mut self, id: SessionId) -> Result<(), ErrorCode> {
        if !self.has_session(id) {
            return Err(ErrorCode::UnknownCommand);
        }
        let game = self.active_game()?;

        let mut out = Outbox::new();
        game.reset(&mut out);
        info!("房间 {} 重置对局", self.name);
        self.flush(out);
        Ok(())
    }

    /// 结束房间：广播 END，所有人退出对局，房间关闭。
    ///
    /// 调用方负责把房间从注册表中移除。
    pub fn end_game(&mut self) {
        if self.closed {
            return;
        }

        for o in &self.occupants {
            o.handle.set_in_game(false);
        }
        self.broadcast(ServerMessage::End);
        self.occupants.clear();
        self.game = None;
        self.closed = true;

        info!("房间 {} 已结束，存续 {:?}", self.name, self.age());
    }

    /// 关闭房间（不发送任何消息）
    pub fn close(&mut self) {
        self.closed = true;
        self.game = None;
    }

    /// 向房间内所有人发送消息
    pub fn broadcast(&self, msg: ServerMessage) {
        for o in &self.occupants {
            o.handle.send(msg.clone());
        }
    }

    fn active_game(&mut self) -> Result<&mut Game, ErrorCode> {
        if self.closed {
            return Err(ErrorCode::UnknownCommand);
        }
        self.game.as_mut().ok_or(ErrorCode::UnknownCommand)
    }

    fn flush(&self, out: Outbox) {
        for msg in out {
            self.broadcast(msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{Position, MAX_CHANCE, MAX_LIFE};
    use tokio::sync::mpsc;

    struct Client {
        handle: Arc<SessionHandle>,
        rx: mpsc::UnboundedReceiver<ServerMessage>,
    }

    impl Client {
        fn new(id: SessionId) -> Self {
            let (tx, rx) = mpsc::unbounded_channel();
            Self {
                handle: Arc::new(SessionHandle::new(id, tx)),
                rx,
            }
        }

        fn occupant(&self, nickname: &str) -> Occupant {
            Occupant::new(Arc::clone(&self.handle), nickname.to_string())
        }

        fn drain(&mut self) -> Vec<String> {
            let mut lines = Vec::new();
            while let Ok(msg) = self.rx.try_recv() {
                lines.push(msg.to_string());
            }
            lines
        }
    }

    fn started_room() -> (Room, Client, Client) {
        let mut room = Room::new("test");
        let mut black = Client::new(1);
        let mut white = Client::new(2);
        room.add_occupant(black.occupant("alice"));
        room.add_occupant(white.occupant("bob"));
        room.start_game();
        black.drain();
        white.drain();
        (room, black, white)
    }

    #[test]
    fn test_add_occupant() {
        let mut room = Room::new("alpha");
        let mut a = Client::new(1);
        let mut b = Client::new(2);
        let c = Client::new(3);

        assert_eq!(room.add_occupant(a.occupant("a")), Some(Stone::Black));
        assert_eq!(a.drain(), vec!["JOINED alpha B"]);

        assert_eq!(room.add_occupant(b.occupant("b")), Some(Stone::White));
        // 只有新加入者收到 JOINED
        assert!(a.drain().is_empty());
        assert_eq!(b.drain(), vec!["JOINED alpha W"]);

        assert_eq!(room.add_occupant(c.occupant("c")), None);
        assert!(room.is_full());
        assert_eq!(room.summary().to_string(), "alpha(2/2)");
    }

    #[test]
    fn test_add_same_session_twice() {
        let mut room = Room::new("alpha");
        let a = Client::new(1);
        room.add_occupant(a.occupant("a"));
        assert_eq!(room.add_occupant(a.occupant("a")), None);
        assert_eq!(room.occupant_count(), 1);
    }

    #[test]
    fn test_start_game() {
        let mut room = Room::new("test");
        let mut black = Client::new(1);
        let mut white = Client::new(2);
        room.add_occupant(black.occupant("alice"));
        room.add_occupant(white.occupant("bob"));
        black.drain();
        white.drain();
        assert_eq!(room.state(), RoomState::Waiting);

        room.start_game();

        assert_eq!(room.state(), RoomState::Playing);
        assert!(black.handle.is_in_game());
        assert!(white.handle.is_in_game());
        assert_eq!(black.drain(), vec!["START B", "TURN B"]);
        assert_eq!(white.drain(), vec!["START W", "TURN B"]);
    }

    #[test]
    fn test_place_broadcast() {
        let (mut room, mut black, mut white) = started_room();

        assert_eq!(room.handle_place(1, 7, 7), Ok(PlaceOutcome::Placed));
        assert_eq!(black.drain(), vec!["MOVE 7 7 B", "TURN W"]);
        assert_eq!(white.drain(), vec!["MOVE 7 7 B", "TURN W"]);
    }

    #[test]
    fn test_place_errors_are_not_broadcast() {
        let (mut room, mut black, mut white) = started_room();

        assert_eq!(room.handle_place(2, 7, 7), Err(ErrorCode::NotYourTurn));
        assert_eq!(room.handle_place(1, 15, 0), Err(ErrorCode::OutOfRange));
        assert!(black.drain().is_empty());
        assert!(white.drain().is_empty());
    }

    #[test]
    fn test_place_by_outsider() {
        let (mut room, _black, _white) = started_room();
        assert_eq!(room.handle_place(99, 7, 7), Err(ErrorCode::UnknownCommand));
    }

    #[test]
    fn test_occupied_cell_life_broadcast() {
        let (mut room, mut black, mut white) = started_room();
        room.handle_place(1, 7, 7).unwrap();
        black.drain();
        white.drain();

        assert_eq!(
            room.handle_place(2, 7, 7),
            Ok(PlaceOutcome::Penalized { lives: MAX_LIFE - 1 })
        );
        assert_eq!(black.drain(), vec!["LIFE W 2"]);
        assert_eq!(white.drain(), vec!["LIFE W 2"]);
        // 不换手
        assert_eq!(room.game().unwrap().turn(), Stone::White);
    }

    #[test]
    fn test_use_chance() {
        let (mut room, mut black, mut white) = started_room();

        room.handle_chance(2).unwrap();
        assert_eq!(black.drain(), vec!["CHANCES W 1"]);
        assert_eq!(white.drain(), vec!["CHANCES W 1"]);

        for _ in 0..MAX_CHANCE {
            room.handle_chance(2).unwrap();
        }
        black.drain();
        // 用完后只回复请求方
        assert_eq!(white.drain(), vec!["CHANCES W 0", "CHANCES W 0"]);
        assert!(black.drain().is_empty());
    }

    #[test]
    fn test_reset_after_win() {
        let (mut room, mut black, mut white) = started_room();
        let moves = [
            (1, 7, 0),
            (2, 0, 14),
            (1, 7, 1),
            (2, 1, 14),
            (1, 7, 2),
            (2, 2, 14),
            (1, 7, 3),
            (2, 4, 14),
        ];
        for (id, row, col) in moves {
            room.handle_place(id, row, col).unwrap();
        }
        assert_eq!(room.handle_place(1, 7, 4), Ok(PlaceOutcome::Won));
        assert_eq!(room.state(), RoomState::Over);
        assert_eq!(black.drain().last().map(String::as_str), Some("WIN B"));
        white.drain();

        assert_eq!(room.handle_place(2, 5, 5), Err(ErrorCode::GameOver));

        room.reset(2).unwrap();
        assert_eq!(room.state(), RoomState::Playing);
        let expected = vec![
            "RESET",
            "TURN B",
            "LIFE B 3",
            "LIFE W 3",
            "CHANCES B 2",
            "CHANCES W 2",
        ];
        assert_eq!(black.drain(), expected);
        assert_eq!(white.drain(), expected);
        assert!(room.game().unwrap().board().is_empty_at(Position::new_unchecked(7, 0)));
    }

    #[test]
    fn test_opponent_left_during_game() {
        let (mut room, mut black, mut white) = started_room();

        assert_eq!(room.remove_occupant(1), Some(Stone::Black));
        assert!(black.drain().is_empty());
        assert_eq!(white.drain(), vec!["OPPONENT_LEFT"]);
        assert!(!white.handle.is_in_game());
        assert_eq!(room.state(), RoomState::Waiting);

        // 留下的玩家改执黑
        assert_eq!(room.stone_of(2), Some(Stone::Black));

        let mut carol = Client::new(3);
        assert_eq!(room.add_occupant(carol.occupant("carol")), Some(Stone::White));
        room.start_game();
        assert_eq!(white.drain(), vec!["START B", "TURN B"]);
        assert_eq!(carol.drain(), vec!["JOINED test W", "START W", "TURN B"]);
    }

    #[test]
    fn test_remove_while_waiting_sends_nothing() {
        let mut room = Room::new("solo");
        let mut a = Client::new(1);
        room.add_occupant(a.occupant("a"));
        a.drain();

        assert_eq!(room.remove_occupant(1), Some(Stone::Black));
        assert!(room.is_empty());
        assert!(a.drain().is_empty());
        assert_eq!(room.remove_occupant(1), None);
    }

    #[test]
    fn test_leaving_waiting_room_keeps_game_flag() {
        let mut waiting = Room::new("waiting");
        let mut a = Client::new(1);
        waiting.add_occupant(a.occupant("a"));

        // 已在另一个房间开局
        a.handle.set_in_game(true);
        a.drain();

        waiting.remove_occupant(1);
        assert!(a.handle.is_in_game());
        assert!(a.drain().is_empty());
    }

    #[test]
    fn test_end_game() {
        let (mut room, mut black, mut white) = started_room();

        room.end_game();
        assert_eq!(black.drain(), vec!["END"]);
        assert_eq!(white.drain(), vec!["END"]);
        assert!(!black.handle.is_in_game());
        assert!(!white.handle.is_in_game());
        assert_eq!(room.state(), RoomState::Closed);

        assert_eq!(room.handle_place(1, 7, 7), Err(ErrorCode::UnknownCommand));
        assert_eq!(room.add_occupant(Client::new(3).occupant("c")), None);

        // 重复结束无效果
        room.end_game();
        assert!(black.drain().is_empty());
    }
}
