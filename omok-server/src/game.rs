//! 对局控制
//!
//! 包含棋盘、轮次、生命值、机会次数和黑方禁手集合，以及落子校验流水线。
//! 需要广播的消息按发生顺序写入调用方提供的发件箱，由房间统一发送。

use protocol::{
    Board, ErrorCode, ForbiddenSet, Position, ServerMessage, Stone, WinDetector, MAX_CHANCE,
    MAX_LIFE,
};

/// 待广播的消息（按产生顺序）
pub type Outbox = Vec<ServerMessage>;

/// 一次落子请求的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOutcome {
    /// 正常落子，轮到对方
    Placed,
    /// 落子后连成五子，对局结束
    Won,
    /// 落在已有棋子的位置，扣除一点生命（不换手）
    Penalized { lives: u8 },
}

/// 一局棋的全部状态
#[derive(Debug, Clone)]
pub struct Game {
    board: Board,
    /// 黑方禁手点，每次成功落子后全盘重算
    forbidden: ForbiddenSet,
    turn: Stone,
    /// 生命值，按 [`Stone::index`] 取
    lives: [u8; 2],
    /// 机会次数，按 [`Stone::index`] 取
    chances: [u8; 2],
    /// 胜者；有值即对局结束
    winner: Option<Stone>,
}

impl Game {
    /// 创建新对局：空棋盘，黑方先行
    pub fn new() -> Self {
        let board = Board::empty();
        let forbidden = ForbiddenSet::compute(&board);
        Self {
            board,
            forbidden,
            turn: Stone::Black,
            lives: [MAX_LIFE; 2],
            chances: [MAX_CHANCE; 2],
            winner: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn forbidden(&self) -> &ForbiddenSet {
        &self.forbidden
    }

    pub fn turn(&self) -> Stone {
        self.turn
    }

    pub fn lives(&self, stone: Stone) -> u8 {
        self.lives[stone.index()]
    }

    pub fn chances(&self, stone: Stone) -> u8 {
        self.chances[stone.index()]
    }

    pub fn winner(&self) -> Option<Stone> {
        self.winner
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    /// 把当前所有禁手点写入发件箱（已被占用的旧标记跳过）
    pub fn announce_forbidden(&self, out: &mut Outbox) {
        out.extend(
            self.forbidden
                .positions()
                .filter(|&pos| self.board.is_empty_at(pos))
                .map(|pos| ServerMessage::Ban { pos }),
        );
    }

    /// 落子校验流水线。
    ///
    /// 返回 `Err` 时不修改任何状态，错误只需回复给请求方。
    pub fn place(
        &mut self,
        stone: Stone,
        row: i32,
        col: i32,
        out: &mut Outbox,
    ) -> Result<PlaceOutcome, ErrorCode> {
        if self.is_over() {
            return Err(ErrorCode::GameOver);
        }
        if stone != self.turn {
            return Err(ErrorCode::NotYourTurn);
        }
        let pos = Position::from_signed(row, col).ok_or(ErrorCode::OutOfRange)?;

        let occupied = !self.board.is_empty_at(pos);
        if stone == Stone::Black && !occupied && self.forbidden.contains(pos) {
            return Err(ErrorCode::Forbidden);
        }

        if occupied {
            let lives = self.decrease_life(stone, out);
            return Ok(PlaceOutcome::Penalized { lives });
        }

        self.board.set(pos, Some(stone));
        out.push(ServerMessage::Move { pos, stone });

        if WinDetector::is_win(&self.board, pos, stone) {
            self.finish(stone, out);
            return Ok(PlaceOutcome::Won);
        }

        self.forbidden = ForbiddenSet::compute(&self.board);
        self.announce_forbidden(out);

        self.turn = self.turn.opponent();
        out.push(ServerMessage::Turn { stone: self.turn });

        Ok(PlaceOutcome::Placed)
    }

    /// 使用一次机会。
    ///
    /// 返回 `Some(剩余次数)` 表示成功（已写入广播）；
    /// 返回 `None` 表示次数已用完，状态不变。
    pub fn use_chance(&mut self, stone: Stone, out: &mut Outbox) -> Result<Option<u8>, ErrorCode> {
        if self.is_over() {
            return Err(ErrorCode::GameOver);
        }

        let chances = &mut self.chances[stone.index()];
        if *chances == 0 {
            return Ok(None);
        }
        *chances -= 1;
        let chances = *chances;
        out.push(ServerMessage::Chances { stone, chances });
        Ok(Some(chances))
    }

    /// 重置为初始状态并写入全部变化
    pub fn reset(&mut self, out: &mut Outbox) {
        *self = Game::new();

        out.push(ServerMessage::Reset);
        out.push(ServerMessage::Turn { stone: self.turn });
        for stone in [Stone::Black, Stone::White] {
            out.push(ServerMessage::Life {
                stone,
                lives: self.lives(stone),
            });
        }
        for stone in [Stone::Black, Stone::White] {
            out.push(ServerMessage::Chances {
                stone,
                chances: self.chances(stone),
            });
        }
        self.announce_forbidden(out);
    }

    /// 扣除一点生命（最低为 0），归零则对方获胜
    fn decrease_life(&mut self, stone: Stone, out: &mut Outbox) -> u8 {
        let lives = &mut self.lives[stone.index()];
        *lives = lives.saturating_sub(1);
        let lives = *lives;
        out.push(ServerMessage::Life { stone, lives });

        if lives == 0 {
            self.finish(stone.opponent(), out);
        }
        lives
    }

    fn finish(&mut self, winner: Stone, out: &mut Outbox) {
        self.winner = Some(winner);
        out.push(ServerMessage::Win { stone: winner });
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}
