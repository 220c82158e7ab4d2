//! 棋盘状态

use serde::{Deserialize, Serialize};

use crate::constants::BOARD_SIZE;
use crate::stone::{Position, Stone};

/// 四条无向轴：横、竖、主对角线、副对角线
pub const AXES: [(i32, i32); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// 棋盘
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// 15x15 棋盘，索引为 row * 15 + col，使用 Vec 以支持 serde
    cells: Vec<Option<Stone>>,
}

impl Board {
    /// 创建空棋盘
    pub fn empty() -> Self {
        Self {
            cells: vec![None; BOARD_SIZE * BOARD_SIZE],
        }
    }

    /// 获取指定位置的棋子
    pub fn get(&self, pos: Position) -> Option<Stone> {
        if pos.is_valid() {
            self.cells[pos.to_index()]
        } else {
            None
        }
    }

    /// 设置指定位置的棋子
    pub fn set(&mut self, pos: Position, stone: Option<Stone>) {
        if pos.is_valid() {
            self.cells[pos.to_index()] = stone;
        }
    }

    /// 位置是否为空
    pub fn is_empty_at(&self, pos: Position) -> bool {
        self.get(pos).is_none()
    }

    /// 从 `pos` 起（含）沿 (dr, dc) 方向连续同色棋子数
    pub fn count_direction(&self, pos: Position, dr: i32, dc: i32, stone: Stone) -> usize {
        let mut count = 0;
        let mut current = Some(pos);
        while let Some(p) = current {
            if self.get(p) != Some(stone) {
                break;
            }
            count += 1;
            current = p.offset(dr, dc);
        }
        count
    }

    /// 经过 `pos` 的某条轴上的连子长度（正反两向之和减去重复计算的起点）
    pub fn run_length(&self, pos: Position, axis: (i32, i32), stone: Stone) -> usize {
        let (dr, dc) = axis;
        let forward = self.count_direction(pos, dr, dc, stone);
        let backward = self.count_direction(pos, -dr, -dc, stone);
        (forward + backward).saturating_sub(1)
    }

    /// 以 `pos` 为中心、沿轴取偏移 -radius..=radius 的窗口字符串。
    ///
    /// 棋盘外记为 `X`，空位记为 `.`，棋子记为 `B` / `W`。
    pub fn window(&self, pos: Position, axis: (i32, i32), radius: i32) -> String {
        let (dr, dc) = axis;
        (-radius..=radius)
            .map(|k| match pos.offset(dr * k, dc * k) {
                None => 'X',
                Some(p) => self.get(p).map_or('.', |stone| stone.to_char()),
            })
            .collect()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}
