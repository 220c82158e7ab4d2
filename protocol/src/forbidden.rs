//! 黑方禁手判定（长连、双三、双四）
//!
//! 判定方式：假设在候选点落一颗黑子，
//! 1. 任一轴连子超过五颗即为长连；
//! 2. 在四条轴上各取以候选点为中心的 11 格窗口，与活三、活四模板做子串匹配，
//!    两条及以上的轴同时成活三（或同时成活四）即为禁手。
//!
//! 判定结束后撤销假设的落子，调用方的棋盘保持不变。

use serde::{Deserialize, Serialize};

use crate::board::{Board, AXES};
use crate::constants::{BOARD_SIZE, WIN_LENGTH};
use crate::stone::{Position, Stone};

/// 窗口半径：取偏移 -5..=5 共 11 格
const WINDOW_RADIUS: i32 = 5;

/// 活三模板（含跳三）
const OPEN_THREE_PATTERNS: [&str; 6] = [
    ".BBB.",
    ".BB.B.",
    ".B.BB.",
    ".B.B.B.",
    "..BB.B..",
    "..B.BB..",
];

/// 活四模板
const OPEN_FOUR_PATTERNS: [&str; 4] = [".BBBB.", ".BBB.B.", ".BB.BB.", ".B.BBB."];

/// 禁手类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForbiddenKind {
    /// 长连（六子及以上）
    Overline,
    /// 双活三
    DoubleThree,
    /// 双活四
    DoubleFour,
}

/// 禁手判定器
pub struct ForbiddenEvaluator;

impl ForbiddenEvaluator {
    /// 判定黑方在 `pos` 落子是否为禁手。
    ///
    /// 已有棋子的位置不适用禁手规则，返回 `None`。
    pub fn check(board: &mut Board, pos: Position) -> Option<ForbiddenKind> {
        if !board.is_empty_at(pos) {
            return None;
        }

        board.set(pos, Some(Stone::Black));
        let result = Self::classify(board, pos);
        board.set(pos, None);

        result
    }

    /// 在已经假设落子的棋盘上分类
    fn classify(board: &Board, pos: Position) -> Option<ForbiddenKind> {
        let overline = AXES
            .iter()
            .any(|&axis| board.run_length(pos, axis, Stone::Black) > WIN_LENGTH);
        if overline {
            return Some(ForbiddenKind::Overline);
        }

        let mut open_threes = 0;
        let mut open_fours = 0;
        for axis in AXES {
            let line = board.window(pos, axis, WINDOW_RADIUS);
            if Self::is_open_three(&line) {
                open_threes += 1;
            }
            if Self::is_open_four(&line) {
                open_fours += 1;
            }
        }

        if open_threes >= 2 {
            Some(ForbiddenKind::DoubleThree)
        } else if open_fours >= 2 {
            Some(ForbiddenKind::DoubleFour)
        } else {
            None
        }
    }

    fn is_open_three(line: &str) -> bool {
        OPEN_THREE_PATTERNS.iter().any(|p| line.contains(p))
    }

    fn is_open_four(line: &str) -> bool {
        OPEN_FOUR_PATTERNS.iter().any(|p| line.contains(p))
    }
}

/// 全盘禁手点集合（仅针对黑方，仅对空位有意义）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForbiddenSet {
    cells: Vec<bool>,
}

impl ForbiddenSet {
    /// 空集合
    pub fn new() -> Self {
        Self {
            cells: vec![false; BOARD_SIZE * BOARD_SIZE],
        }
    }

    /// 对每个空位重新判定，得到完整的禁手集合
    pub fn compute(board: &Board) -> Self {
        let mut set = Self::new();
        let mut scratch = board.clone();
        for pos in Position::all() {
            if ForbiddenEvaluator::check(&mut scratch, pos).is_some() {
                set.cells[pos.to_index()] = true;
            }
        }
        set
    }

    /// 是否被标记为禁手
    pub fn contains(&self, pos: Position) -> bool {
        pos.is_valid() && self.cells[pos.to_index()]
    }

    /// 按行优先顺序列出所有禁手点
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        Position::all().filter(move |pos| self.cells[pos.to_index()])
    }

    pub fn is_empty(&self) -> bool {
        !self.cells.iter().any(|&flag| flag)
    }
}

impl Default for ForbiddenSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(row: u8, col: u8) -> Position {
        Position::new_unchecked(row, col)
    }

    fn board_with(stones: &[(u8, u8, Stone)]) -> Board {
        let mut board = Board::empty();
        for &(row, col, stone) in stones {
            board.set(pos(row, col), Some(stone));
        }
        board
    }

    const B: Stone = Stone::Black;
    const W: Stone = Stone::White;

    #[test]
    fn test_double_three() {
        let mut board = board_with(&[(7, 5, B), (7, 6, B), (5, 7, B), (6, 7, B)]);
        assert_eq!(
            ForbiddenEvaluator::check(&mut board, pos(7, 7)),
            Some(ForbiddenKind::DoubleThree)
        );
        // 假设落子已撤销
        assert!(board.is_empty_at(pos(7, 7)));
    }

    #[test]
    fn test_single_three_allowed() {
        let mut board = board_with(&[(7, 5, B), (7, 6, B)]);
        assert_eq!(ForbiddenEvaluator::check(&mut board, pos(7, 7)), None);
    }

    #[test]
    fn test_split_double_three() {
        // 横向 .BB.B. 与纵向 .BBB. 交于 (7, 8)
        let mut board = board_with(&[(7, 5, B), (7, 6, B), (5, 8, B), (6, 8, B)]);
        assert_eq!(
            ForbiddenEvaluator::check(&mut board, pos(7, 8)),
            Some(ForbiddenKind::DoubleThree)
        );
    }

    #[test]
    fn test_blocked_three_not_counted() {
        let mut board = board_with(&[(7, 4, W), (7, 5, B), (7, 6, B), (5, 7, B), (6, 7, B)]);
        assert_eq!(ForbiddenEvaluator::check(&mut board, pos(7, 7)), None);
    }

    #[test]
    fn test_overline() {
        let mut board = board_with(&[(7, 0, B), (7, 1, B), (7, 2, B), (7, 4, B), (7, 5, B)]);
        assert_eq!(
            ForbiddenEvaluator::check(&mut board, pos(7, 3)),
            Some(ForbiddenKind::Overline)
        );
    }

    #[test]
    fn test_exact_five_is_not_overline() {
        let mut board = board_with(&[(7, 0, B), (7, 1, B), (7, 2, B), (7, 4, B)]);
        assert_eq!(ForbiddenEvaluator::check(&mut board, pos(7, 3)), None);
    }

    #[test]
    fn test_double_four() {
        let mut board = board_with(&[
            (7, 4, B),
            (7, 5, B),
            (7, 6, B),
            (4, 7, B),
            (5, 7, B),
            (6, 7, B),
        ]);
        assert_eq!(
            ForbiddenEvaluator::check(&mut board, pos(7, 7)),
            Some(ForbiddenKind::DoubleFour)
        );
    }

    #[test]
    fn test_four_three_allowed() {
        let mut board = board_with(&[(7, 4, B), (7, 5, B), (7, 6, B), (5, 7, B), (6, 7, B)]);
        assert_eq!(ForbiddenEvaluator::check(&mut board, pos(7, 7)), None);
    }

    #[test]
    fn test_occupied_cell_never_forbidden() {
        let mut board = board_with(&[(7, 5, B), (7, 6, B), (5, 7, B), (6, 7, B), (7, 7, W)]);
        assert_eq!(ForbiddenEvaluator::check(&mut board, pos(7, 7)), None);
    }

    #[test]
    fn test_forbidden_set_subset_of_empty() {
        let board = board_with(&[(7, 5, B), (7, 6, B), (5, 7, B), (6, 7, B), (0, 0, W)]);
        let set = ForbiddenSet::compute(&board);

        assert!(set.contains(pos(7, 7)));
        assert!(set.positions().all(|p| board.is_empty_at(p)));
        assert!(!set.contains(pos(0, 0)));
    }

    #[test]
    fn test_white_shapes_never_forbidden() {
        let board = board_with(&[(7, 5, W), (7, 6, W), (5, 7, W), (6, 7, W)]);
        let set = ForbiddenSet::compute(&board);
        assert!(set.is_empty());
        let mut scratch = board.clone();
        assert_eq!(ForbiddenEvaluator::check(&mut scratch, pos(7, 7)), None);
    }

    #[test]
    fn test_empty_board_has_no_forbidden_cells() {
        let set = ForbiddenSet::compute(&Board::empty());
        assert!(set.is_empty());
        assert_eq!(set.positions().count(), 0);
    }
}
