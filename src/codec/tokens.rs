// Copyright 2025-present BlackLab core contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-document token stream codec: `.tokens` / `.tokensindex` (spec §4.1, §6.2).
//!
//! Each document picks the cheapest of two encodings:
//!
//! - `AllTokensTheSame`: one `i32` term id represents every position. Common
//!   for short or single-term-repeated fields.
//! - `ValuePerToken(width)`: one term id per position, packed at the
//!   narrowest width (`Byte`, `Short`, `ThreeBytes`, `Int`) that holds the
//!   document's maximum term id.
//!
//! `NO_TERM` (`-1`) is a valid payload at any width: it marks a gap, a
//! position with no primary value (I4).

use crate::error::FormatError;

/// Sentinel denoting "no term at this position" (I4).
pub const NO_TERM: i32 = -1;

/// Codec tag stored in `.tokensindex` (§6.2's `codec_tag` byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecTag {
    AllTokensTheSame = 0,
    ValuePerToken = 1,
}

impl CodecTag {
    pub fn from_u8(tag: u8) -> Result<Self, FormatError> {
        match tag {
            0 => Ok(CodecTag::AllTokensTheSame),
            1 => Ok(CodecTag::ValuePerToken),
            other => Err(FormatError::UnknownCodecTag(other)),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Width parameter for `ValuePerToken`, chosen per spec §4.1: "the width
/// chosen is the smallest that holds the maximum term id in the doc."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenWidth {
    Byte = 1,
    Short = 2,
    ThreeBytes = 3,
    Int = 4,
}

impl TokenWidth {
    pub fn from_u8(param: u8) -> Result<Self, FormatError> {
        match param {
            1 => Ok(TokenWidth::Byte),
            2 => Ok(TokenWidth::Short),
            3 => Ok(TokenWidth::ThreeBytes),
            4 => Ok(TokenWidth::Int),
            other => Err(FormatError::UnknownTokenWidth(other)),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn bytes(self) -> usize {
        self as usize
    }

    /// Smallest width that can hold `max_value` (which may be `NO_TERM`,
    /// treated as requiring the full signed range of that width).
    fn smallest_for(max_value: i32) -> TokenWidth {
        // NO_TERM (-1) fits in every width since each width's encoding
        // reserves its all-ones pattern / sign-extends -1 correctly (see
        // encode_token/decode_token below). So only positive term ids drive
        // the width choice.
        if max_value <= 0 {
            return TokenWidth::Byte;
        }
        if max_value < (1 << 8) - 1 {
            TokenWidth::Byte
        } else if max_value < (1 << 16) - 1 {
            TokenWidth::Short
        } else if max_value < (1 << 24) - 1 {
            TokenWidth::ThreeBytes
        } else {
            TokenWidth::Int
        }
    }
}

/// Encode one term id (possibly `NO_TERM`) at the given width, appending to
/// `buf`. We reserve the all-ones bit pattern of each width for `NO_TERM`
/// rather than sign-extending, so a `Byte`-width stream can still represent
/// "no term" without promoting every document to `Short`.
fn encode_token(term_id: i32, width: TokenWidth, buf: &mut Vec<u8>) {
    match width {
        TokenWidth::Byte => {
            let v: u8 = if term_id == NO_TERM { 0xFF } else { term_id as u8 };
            buf.push(v);
        }
        TokenWidth::Short => {
            let v: u16 = if term_id == NO_TERM { 0xFFFF } else { term_id as u16 };
            buf.extend_from_slice(&v.to_be_bytes());
        }
        TokenWidth::ThreeBytes => {
            let v: u32 = if term_id == NO_TERM { 0x00FF_FFFF } else { term_id as u32 };
            buf.extend_from_slice(&v.to_be_bytes()[1..4]);
        }
        TokenWidth::Int => {
            buf.extend_from_slice(&term_id.to_be_bytes());
        }
    }
}

fn decode_token(bytes: &[u8], width: TokenWidth) -> i32 {
    match width {
        TokenWidth::Byte => {
            let v = bytes[0];
            if v == 0xFF { NO_TERM } else { v as i32 }
        }
        TokenWidth::Short => {
            let v = u16::from_be_bytes([bytes[0], bytes[1]]);
            if v == 0xFFFF { NO_TERM } else { v as i32 }
        }
        TokenWidth::ThreeBytes => {
            let v = u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]);
            if v == 0x00FF_FFFF { NO_TERM } else { v as i32 }
        }
        TokenWidth::Int => i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
    }
}

/// The decision of how to encode one document's token array, plus its
/// packed payload bytes. Returned by [`choose_and_encode`].
pub struct EncodedDoc {
    pub tag: CodecTag,
    /// Meaningful only when `tag == ValuePerToken`; `0` otherwise (per
    /// §4.1's `codec_param`, unused bits are zero, not undefined).
    pub width_param: u8,
    pub payload: Vec<u8>,
}

/// Choose the cheapest per-doc codec via one linear scan (§4.1 step 4):
/// compute `max(term_id)` and an "all the same" flag, then encode.
pub fn choose_and_encode(tokens: &[i32]) -> EncodedDoc {
    if tokens.is_empty() {
        return EncodedDoc { tag: CodecTag::AllTokensTheSame, width_param: 0, payload: Vec::new() };
    }

    let first = tokens[0];
    let all_same = tokens.iter().all(|&t| t == first);
    let max_term = tokens.iter().copied().filter(|&t| t != NO_TERM).max();

    if all_same {
        let mut payload = Vec::with_capacity(4);
        payload.extend_from_slice(&first.to_be_bytes());
        return EncodedDoc { tag: CodecTag::AllTokensTheSame, width_param: 0, payload };
    }

    let width = TokenWidth::smallest_for(max_term.unwrap_or(0));
    let mut payload = Vec::with_capacity(tokens.len() * width.bytes());
    for &t in tokens {
        encode_token(t, width, &mut payload);
    }
    EncodedDoc { tag: CodecTag::ValuePerToken, width_param: width.as_u8(), payload }
}

/// Decode `[start, end)` of a document's token stream from its packed
/// payload, per the tokens-index entry's tag/width. `length` is the
/// document's recorded `doc_length`; `[start, end)` is clamped to
/// `[0, length)` by the caller (the forward-index reader, §4.2).
pub fn decode_range(
    payload: &[u8],
    tag: CodecTag,
    width_param: u8,
    length: usize,
    start: usize,
    end: usize,
) -> Result<Vec<i32>, FormatError> {
    debug_assert!(start <= end && end <= length);
    match tag {
        CodecTag::AllTokensTheSame => {
            if payload.len() < 4 {
                return Err(FormatError::TruncatedSection { section: "all-tokens-the-same payload" });
            }
            let term = i32::from_be_bytes(payload[0..4].try_into().unwrap());
            Ok(vec![term; end - start])
        }
        CodecTag::ValuePerToken => {
            let width = TokenWidth::from_u8(width_param)?;
            let stride = width.bytes();
            let needed = length
                .checked_mul(stride)
                .ok_or(FormatError::TruncatedSection { section: "token payload" })?;
            if payload.len() < needed {
                return Err(FormatError::TruncatedSection { section: "token payload" });
            }
            let mut out = Vec::with_capacity(end - start);
            for pos in start..end {
                let offset = pos * stride;
                out.push(decode_token(&payload[offset..offset + stride], width));
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s1_value_per_token_byte_width() {
        // Scenario S1: tokens [3, 1, 3, 2], max term id 3 fits in a byte.
        let tokens = vec![3, 1, 3, 2];
        let encoded = choose_and_encode(&tokens);
        assert_eq!(encoded.tag, CodecTag::ValuePerToken);
        assert_eq!(TokenWidth::from_u8(encoded.width_param).unwrap(), TokenWidth::Byte);
        assert_eq!(encoded.payload, vec![3, 1, 3, 2]);

        let decoded = decode_range(&encoded.payload, encoded.tag, encoded.width_param, 4, 0, 4).unwrap();
        assert_eq!(decoded, tokens);
    }

    #[test]
    fn s2_all_tokens_the_same() {
        // Scenario S2: 1000 positions, all term id 7.
        let tokens = vec![7; 1000];
        let encoded = choose_and_encode(&tokens);
        assert_eq!(encoded.tag, CodecTag::AllTokensTheSame);
        assert_eq!(encoded.payload, 7i32.to_be_bytes().to_vec());

        let decoded = decode_range(&encoded.payload, encoded.tag, 0, 1000, 0, 1000).unwrap();
        assert_eq!(decoded, tokens);
        assert_eq!(decoded.len(), 1000);
    }

    #[test]
    fn empty_doc_writes_no_payload() {
        let encoded = choose_and_encode(&[]);
        assert!(encoded.payload.is_empty());
        let decoded = decode_range(&encoded.payload, encoded.tag, encoded.width_param, 0, 0, 0).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn gap_positions_round_trip_as_no_term() {
        let tokens = vec![5, NO_TERM, 9, NO_TERM];
        let encoded = choose_and_encode(&tokens);
        let decoded = decode_range(&encoded.payload, encoded.tag, encoded.width_param, 4, 0, 4).unwrap();
        assert_eq!(decoded, tokens);
    }

    #[test]
    fn width_escalates_as_max_term_grows() {
        assert_eq!(TokenWidth::smallest_for(10), TokenWidth::Byte);
        assert_eq!(TokenWidth::smallest_for(1000), TokenWidth::Short);
        assert_eq!(TokenWidth::smallest_for(100_000), TokenWidth::ThreeBytes);
        assert_eq!(TokenWidth::smallest_for(100_000_000), TokenWidth::Int);
    }

    #[test]
    fn partial_range_decode_matches_full_decode_slice() {
        let tokens: Vec<i32> = (0..50).collect();
        let encoded = choose_and_encode(&tokens);
        let full = decode_range(&encoded.payload, encoded.tag, encoded.width_param, 50, 0, 50).unwrap();
        let partial = decode_range(&encoded.payload, encoded.tag, encoded.width_param, 50, 10, 20).unwrap();
        assert_eq!(partial, full[10..20]);
    }

    #[test]
    fn unknown_codec_tag_is_rejected() {
        assert!(matches!(CodecTag::from_u8(2), Err(FormatError::UnknownCodecTag(2))));
    }

    #[test]
    fn unknown_width_param_is_rejected() {
        assert!(matches!(TokenWidth::from_u8(9), Err(FormatError::UnknownTokenWidth(9))));
    }
}
