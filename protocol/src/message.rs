//! 消息类型定义与文本编解码
//!
//! 每条消息占一行 UTF-8 文本。客户端命令通过 [`std::str::FromStr`] 解析，
//! 服务端消息通过 [`std::fmt::Display`] 编码。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::stone::{Position, Stone};

/// 房间列表中的一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub name: String,
    /// 当前人数（0..=2）
    pub occupants: usize,
}

impl fmt::Display for RoomSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}/2)", self.name, self.occupants)
    }
}

/// 客户端发送给服务端的命令
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessage {
    // === 大厅 ===
    /// 设置昵称
    Nick { nickname: String },
    /// 获取房间列表
    RoomList,
    /// 创建房间
    CreateRoom { name: String },
    /// 加入房间
    JoinRoom { name: String },

    // === 对局 ===
    /// 落子（坐标保留原始有符号值，由房间做范围检查）
    Place { row: i32, col: i32 },
    /// 使用一次查看全盘的机会
    UseChance,
    /// 重置棋局
    Reset,
    /// 结束并解散房间
    End,
}

impl ClientMessage {
    /// 是否为大厅命令
    pub fn is_lobby(&self) -> bool {
        matches!(
            self,
            ClientMessage::Nick { .. }
                | ClientMessage::RoomList
                | ClientMessage::CreateRoom { .. }
                | ClientMessage::JoinRoom { .. }
        )
    }

    /// 解析房间名参数：必须恰好一个不含空白的词
    fn parse_room_name(args: &[&str]) -> Result<String, ErrorCode> {
        match args {
            [] => Err(ErrorCode::NoName),
            [name] => Ok(name.to_string()),
            _ => Err(ErrorCode::BadFormat),
        }
    }

    /// 无参数命令
    fn expect_no_args(args: &[&str], msg: ClientMessage) -> Result<ClientMessage, ErrorCode> {
        if args.is_empty() {
            Ok(msg)
        } else {
            Err(ErrorCode::BadFormat)
        }
    }
}

impl FromStr for ClientMessage {
    type Err = ErrorCode;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let mut tokens = line.split_whitespace();
        let command = tokens.next().ok_or(ErrorCode::BadFormat)?;
        let args: Vec<&str> = tokens.collect();

        match command {
            "NICK" => {
                // 昵称允许包含空格，取命令后的整行
                let nickname = line[command.len()..].trim();
                if nickname.is_empty() {
                    return Err(ErrorCode::NoNick);
                }
                Ok(ClientMessage::Nick {
                    nickname: nickname.to_string(),
                })
            }
            "ROOMLIST" => Self::expect_no_args(&args, ClientMessage::RoomList),
            "CREATEROOM" => Ok(ClientMessage::CreateRoom {
                name: Self::parse_room_name(&args)?,
            }),
            "JOINROOM" => Ok(ClientMessage::JoinRoom {
                name: Self::parse_room_name(&args)?,
            }),
            "PLACE" => match args.as_slice() {
                [row, col] => {
                    let row = row.parse().map_err(|_| ErrorCode::BadFormat)?;
                    let col = col.parse().map_err(|_| ErrorCode::BadFormat)?;
                    Ok(ClientMessage::Place { row, col })
                }
                _ => Err(ErrorCode::BadFormat),
            },
            "USECHANCE" => Self::expect_no_args(&args, ClientMessage::UseChance),
            "RESET" => Self::expect_no_args(&args, ClientMessage::Reset),
            "END" => Self::expect_no_args(&args, ClientMessage::End),
            _ => Err(ErrorCode::UnknownCommand),
        }
    }
}

impl fmt::Display for ClientMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientMessage::Nick { nickname } => write!(f, "NICK {}", nickname),
            ClientMessage::RoomList => write!(f, "ROOMLIST"),
            ClientMessage::CreateRoom { name } => write!(f, "CREATEROOM {}", name),
            ClientMessage::JoinRoom { name } => write!(f, "JOINROOM {}", name),
            ClientMessage::Place { row, col } => write!(f, "PLACE {} {}", row, col),
            ClientMessage::UseChance => write!(f, "USECHANCE"),
            ClientMessage::Reset => write!(f, "RESET"),
            ClientMessage::End => write!(f, "END"),
        }
    }
}

/// 服务端发送给客户端的消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerMessage {
    // === 大厅 ===
    /// 昵称设置成功
    NickOk,
    /// 房间列表（为空时编码为 `ROOMLIST EMPTY`）
    RoomList { rooms: Vec<RoomSummary> },
    /// 房间创建成功
    RoomCreated { name: String },
    /// 已进入房间，附带分配到的颜色
    Joined { name: String, stone: Stone },

    // === 对局 ===
    /// 游戏开始，附带自己的颜色
    Start { stone: Stone },
    /// 轮到某方落子
    Turn { stone: Stone },
    /// 落子完成
    Move { pos: Position, stone: Stone },
    /// 黑方禁手点
    Ban { pos: Position },
    /// 生命值变化
    Life { stone: Stone, lives: u8 },
    /// 机会次数变化
    Chances { stone: Stone, chances: u8 },
    /// 某方获胜
    Win { stone: Stone },
    /// 棋局已重置
    Reset,
    /// 房间已解散
    End,
    /// 对手断开连接
    OpponentLeft,

    // === 错误 ===
    Error { code: ErrorCode },
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::NickOk => write!(f, "NICKOK"),
            ServerMessage::RoomList { rooms } if rooms.is_empty() => write!(f, "ROOMLIST EMPTY"),
            ServerMessage::RoomList { rooms } => {
                write!(f, "ROOMLIST")?;
                for room in rooms {
                    write!(f, " {}", room)?;
                }
                Ok(())
            }
            ServerMessage::RoomCreated { name } => write!(f, "ROOMCREATED {}", name),
            ServerMessage::Joined { name, stone } => write!(f, "JOINED {} {}", name, stone),
            ServerMessage::Start { stone } => write!(f, "START {}", stone),
            ServerMessage::Turn { stone } => write!(f, "TURN {}", stone),
            ServerMessage::Move { pos, stone } => {
                write!(f, "MOVE {} {} {}", pos.row, pos.col, stone)
            }
            ServerMessage::Ban { pos } => write!(f, "BAN {} {}", pos.row, pos.col),
            ServerMessage::Life { stone, lives } => write!(f, "LIFE {} {}", stone, lives),
            ServerMessage::Chances { stone, chances } => {
                write!(f, "CHANCES {} {}", stone, chances)
            }
            ServerMessage::Win { stone } => write!(f, "WIN {}", stone),
            ServerMessage::Reset => write!(f, "RESET"),
            ServerMessage::End => write!(f, "END"),
            ServerMessage::OpponentLeft => write!(f, "OPPONENT_LEFT"),
            ServerMessage::Error { code } => write!(f, "ERROR {}", code),
        }
    }
}

impl From<ErrorCode> for ServerMessage {
    fn from(code: ErrorCode) -> Self {
        ServerMessage::Error { code }
    }
}

/// 错误码定义（即 `ERROR <reason>` 中的 reason）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // === 命令格式 ===
    /// 参数个数或格式错误
    BadFormat,
    /// 未知命令
    UnknownCommand,
    /// 缺少房间名
    NoName,
    /// 缺少昵称
    NoNick,

    // === 房间 ===
    /// 房间不存在
    NoSuchRoom,
    /// 房间已满
    RoomFull,
    /// 房间名已存在
    RoomExists,

    // === 对局 ===
    /// 不是你的回合
    NotYourTurn,
    /// 黑方禁手
    Forbidden,
    /// 坐标超出棋盘
    OutOfRange,
    /// 对局已结束，需要 RESET
    GameOver,
}

impl ErrorCode {
    /// 协议中的文本
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadFormat => "BadFormat",
            ErrorCode::UnknownCommand => "UnknownCommand",
            ErrorCode::NoName => "NoName",
            ErrorCode::NoNick => "NoNick",
            ErrorCode::NoSuchRoom => "NoSuchRoom",
            ErrorCode::RoomFull => "RoomFull",
            ErrorCode::RoomExists => "RoomExists",
            ErrorCode::NotYourTurn => "NotYourTurn",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::OutOfRange => "OutOfRange",
            ErrorCode::GameOver => "GameOver",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
