//! 胜负判定

use crate::board::{Board, AXES};
use crate::constants::WIN_LENGTH;
use crate::stone::{Position, Stone};

/// 五子连珠判定
pub struct WinDetector;

impl WinDetector {
    /// 刚落在 `pos` 的 `stone` 是否在任一轴上连成五子或以上
    pub fn is_win(board: &Board, pos: Position, stone: Stone) -> bool {
        AXES.iter()
            .any(|&axis| board.run_length(pos, axis, stone) >= WIN_LENGTH)
    }
}
