// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::domain::error::EventDecodeFailed;
use crate::domain::model::{LottoMode, LottoTicket};
use alloy::primitives::{Address, Bytes, Log, U256};
use alloy::sol;
use alloy::sol_types::{SolCall, SolEvent};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IVinToken {
        event Transfer(address indexed from, address indexed to, uint256 value);

        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    #[derive(Debug, PartialEq, Eq)]
    interface IVinSwap {
        function swapVINtoMON(uint256 vinAmount) external;
        function swapMONtoVIN() external payable;
    }

    #[derive(Debug, PartialEq, Eq)]
    interface IVinDice {
        event Played(address indexed player, uint256 amount, uint8 choice, uint8 diceResult, uint16 roll, bool won);

        function play(uint256 amount, uint8 choice, uint256 clientSeed) external;
        function MIN_BET() external view returns (uint256);
        function MAX_BET() external view returns (uint256);
        function maxBetAllowed(address player) external view returns (uint256);
    }

    // Earlier dice deployment: same entry points, no roll in the event.
    #[derive(Debug, PartialEq, Eq)]
    interface IVinDiceLegacy {
        event Played(address indexed player, uint256 amount, uint8 choice, uint8 result, bool won);
    }

    #[derive(Debug, PartialEq, Eq)]
    interface IVinLotto {
        event Played(address indexed player, bool bet27, uint8[] numbers, uint256[] amounts, uint8[27] results, uint256 totalBet, uint256 totalPayout);

        function play(bool bet27, uint8[] calldata numbers, uint256[] calldata amounts) external;
        function MIN_BET() external view returns (uint256);
    }

    #[derive(Debug, PartialEq, Eq)]
    interface IVinLottoBets {
        struct Bet {
            uint8 number;
            uint256 amount;
            uint8 betType;
        }

        event Played(address indexed player, Bet[] bets, uint8[27] results, uint256 totalBet, uint256 totalPayout);

        function play(Bet[] calldata bets) external;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiceProfile {
    /// `Played(..., uint8 diceResult, uint16 roll, bool won)`
    #[default]
    RollV2,
    /// `Played(..., uint8 result, bool won)`
    Legacy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LottoProfile {
    /// `play(bool bet27, uint8[] numbers, uint256[] amounts)`
    #[default]
    FlatArrays,
    /// `play((uint8 number, uint256 amount, uint8 betType)[] bets)`
    StructBets,
}

/// ABI shape of a bound contract, fixed when the binding is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractProfile {
    Token,
    Swap,
    Dice(DiceProfile),
    Lotto(LottoProfile),
}

impl FromStr for DiceProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "roll_v2" | "v2" | "roll" => Ok(DiceProfile::RollV2),
            "legacy" | "v1" | "result" => Ok(DiceProfile::Legacy),
            other => Err(format!("unknown dice profile '{other}'")),
        }
    }
}

impl FromStr for LottoProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "flat_arrays" | "flat" | "arrays" => Ok(LottoProfile::FlatArrays),
            "struct_bets" | "struct" | "bets" => Ok(LottoProfile::StructBets),
            other => Err(format!("unknown lotto profile '{other}'")),
        }
    }
}

impl fmt::Display for DiceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiceProfile::RollV2 => f.write_str("roll_v2"),
            DiceProfile::Legacy => f.write_str("legacy"),
        }
    }
}

impl fmt::Display for LottoProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LottoProfile::FlatArrays => f.write_str("flat_arrays"),
            LottoProfile::StructBets => f.write_str("struct_bets"),
        }
    }
}

/// Normalized dice `Played` event across profiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DicePlayed {
    pub player: Address,
    pub amount: U256,
    pub choice: u8,
    pub outcome: u8,
    pub roll: Option<u16>,
    pub won: bool,
}

/// Normalized lotto `Played` event across profiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LottoPlayed {
    pub player: Address,
    pub bet27: bool,
    pub numbers: Vec<u8>,
    pub amounts: Vec<U256>,
    pub results: Vec<u8>,
    pub total_bet: U256,
    pub total_payout: U256,
}

impl DiceProfile {
    pub fn decode_played(&self, log: &Log) -> Result<DicePlayed, EventDecodeFailed> {
        match self {
            DiceProfile::RollV2 => {
                let ev = IVinDice::Played::decode_log_data(&log.data)
                    .map_err(|e| EventDecodeFailed(e.to_string()))?;
                Ok(DicePlayed {
                    player: ev.player,
                    amount: ev.amount,
                    choice: ev.choice,
                    outcome: ev.diceResult,
                    roll: Some(ev.roll),
                    won: ev.won,
                })
            }
            DiceProfile::Legacy => {
                let ev = IVinDiceLegacy::Played::decode_log_data(&log.data)
                    .map_err(|e| EventDecodeFailed(e.to_string()))?;
                Ok(DicePlayed {
                    player: ev.player,
                    amount: ev.amount,
                    choice: ev.choice,
                    outcome: ev.result,
                    roll: None,
                    won: ev.won,
                })
            }
        }
    }
}

impl LottoProfile {
    pub fn encode_play(&self, ticket: &LottoTicket) -> Bytes {
        match self {
            LottoProfile::FlatArrays => IVinLotto::playCall {
                bet27: ticket.mode.is_bet27(),
                numbers: ticket.numbers(),
                amounts: ticket.amounts(),
            }
            .abi_encode()
            .into(),
            LottoProfile::StructBets => {
                let bet_type = bet_type_of(ticket.mode);
                IVinLottoBets::playCall {
                    bets: ticket
                        .rows
                        .iter()
                        .map(|row| IVinLottoBets::Bet {
                            number: row.number,
                            amount: row.amount,
                            betType: bet_type,
                        })
                        .collect(),
                }
                .abi_encode()
                .into()
            }
        }
    }

    pub fn decode_played(&self, log: &Log) -> Result<LottoPlayed, EventDecodeFailed> {
        match self {
            LottoProfile::FlatArrays => {
                let ev = IVinLotto::Played::decode_log_data(&log.data)
                    .map_err(|e| EventDecodeFailed(e.to_string()))?;
                Ok(LottoPlayed {
                    player: ev.player,
                    bet27: ev.bet27,
                    numbers: ev.numbers,
                    amounts: ev.amounts,
                    results: ev.results.to_vec(),
                    total_bet: ev.totalBet,
                    total_payout: ev.totalPayout,
                })
            }
            LottoProfile::StructBets => {
                let ev = IVinLottoBets::Played::decode_log_data(&log.data)
                    .map_err(|e| EventDecodeFailed(e.to_string()))?;
                let bet27 = ev.bets.iter().any(|b| b.betType == bet_type_of(LottoMode::Bet27));
                Ok(LottoPlayed {
                    player: ev.player,
                    bet27,
                    numbers: ev.bets.iter().map(|b| b.number).collect(),
                    amounts: ev.bets.iter().map(|b| b.amount).collect(),
                    results: ev.results.to_vec(),
                    total_bet: ev.totalBet,
                    total_payout: ev.totalPayout,
                })
            }
        }
    }
}

fn bet_type_of(mode: LottoMode) -> u8 {
    match mode {
        LottoMode::BetOne => 0,
        LottoMode::Bet27 => 1,
    }
}

/// Sum of token `Transfer(from -> to)` values emitted by `token` in `logs`.
pub fn transferred_between(logs: &[Log], token: Address, from: Address, to: Address) -> Option<U256> {
    let mut total: Option<U256> = None;
    for log in logs.iter().filter(|l| l.address == token) {
        if let Ok(ev) = IVinToken::Transfer::decode_log_data(&log.data)
            && ev.from == from
            && ev.to == to
        {
            total = Some(total.unwrap_or_default().saturating_add(ev.value));
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::LottoRow;
    use alloy::primitives::LogData;

    fn player() -> Address {
        Address::from([0x11; 20])
    }

    fn dice_addr() -> Address {
        Address::from([0xd1; 20])
    }

    #[test]
    fn dice_roll_v2_event_decodes() {
        let ev = IVinDice::Played {
            player: player(),
            amount: U256::from(10u64),
            choice: 1,
            diceResult: 1,
            roll: 4_321,
            won: true,
        };
        let log = Log {
            address: dice_addr(),
            data: ev.encode_log_data(),
        };
        let decoded = DiceProfile::RollV2.decode_played(&log).unwrap();
        assert_eq!(decoded.roll, Some(4_321));
        assert!(decoded.won);
        assert!(DiceProfile::Legacy.decode_played(&log).is_err());
    }

    #[test]
    fn dice_legacy_event_decodes_without_roll() {
        let ev = IVinDiceLegacy::Played {
            player: player(),
            amount: U256::from(3u64),
            choice: 0,
            result: 1,
            won: false,
        };
        let log = Log {
            address: dice_addr(),
            data: ev.encode_log_data(),
        };
        let decoded = DiceProfile::Legacy.decode_played(&log).unwrap();
        assert_eq!(decoded.roll, None);
        assert_eq!(decoded.outcome, 1);
    }

    #[test]
    fn lotto_struct_profile_encodes_bet_type() {
        let ticket = LottoTicket {
            rows: vec![LottoRow {
                number: 9,
                amount: U256::from(2u64),
            }],
            mode: LottoMode::Bet27,
        };
        let encoded = LottoProfile::StructBets.encode_play(&ticket);
        let decoded = IVinLottoBets::playCall::abi_decode(&encoded).unwrap();
        assert_eq!(decoded.bets.len(), 1);
        assert_eq!(decoded.bets[0].betType, 1);

        let flat = LottoProfile::FlatArrays.encode_play(&ticket);
        let decoded = IVinLotto::playCall::abi_decode(&flat).unwrap();
        assert!(decoded.bet27);
        assert_eq!(decoded.numbers, vec![9]);
    }

    #[test]
    fn transfers_are_filtered_by_token_and_parties() {
        let token = Address::from([0xaa; 20]);
        let mk = |from: Address, to: Address, value: u64, emitter: Address| Log {
            address: emitter,
            data: IVinToken::Transfer {
                from,
                to,
                value: U256::from(value),
            }
            .encode_log_data(),
        };
        let logs = vec![
            mk(player(), dice_addr(), 5, token),
            mk(dice_addr(), player(), 10, token),
            mk(dice_addr(), player(), 7, Address::from([0xbb; 20])),
            Log {
                address: token,
                data: LogData::new_unchecked(vec![], Bytes::new()),
            },
        ];
        assert_eq!(
            transferred_between(&logs, token, dice_addr(), player()),
            Some(U256::from(10u64))
        );
        assert_eq!(transferred_between(&logs, token, player(), player()), None);
    }

    #[test]
    fn profiles_parse_from_config_strings() {
        assert_eq!("roll-v2".parse::<DiceProfile>().unwrap(), DiceProfile::RollV2);
        assert_eq!("legacy".parse::<DiceProfile>().unwrap(), DiceProfile::Legacy);
        assert_eq!(
            "struct_bets".parse::<LottoProfile>().unwrap(),
            LottoProfile::StructBets
        );
        assert!("nope".parse::<LottoProfile>().is_err());
    }
}
