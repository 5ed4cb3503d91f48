//! Minimal ToUnicode CMap support
//!
//! Parses `bfchar` and `bfrange` sections (including the array form of
//! `bfrange`) into a code → string table. Codespace ranges decide whether
//! codes are one or two bytes wide.

use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToUnicodeMap {
    map: HashMap<u32, String>,
    code_len: usize,
}

#[derive(Debug, PartialEq)]
enum Token {
    Hex(Vec<u8>),
    Word(String),
    OpenArray,
    CloseArray,
}

impl ToUnicodeMap {
    pub fn parse(data: &[u8]) -> Self {
        let tokens = tokenize(data);
        let mut map = HashMap::new();
        let mut code_len = 0usize;
        let mut i = 0;

        while i < tokens.len() {
            match &tokens[i] {
                Token::Word(w) if w == "begincodespacerange" => {
                    i += 1;
                    while i < tokens.len() && !is_word(&tokens[i], "endcodespacerange") {
                        if let Token::Hex(bytes) = &tokens[i] {
                            code_len = code_len.max(bytes.len());
                        }
                        i += 1;
                    }
                }
                Token::Word(w) if w == "beginbfchar" => {
                    i += 1;
                    while i + 1 < tokens.len() && !is_word(&tokens[i], "endbfchar") {
                        if let (Token::Hex(src), Token::Hex(dst)) = (&tokens[i], &tokens[i + 1]) {
                            code_len = code_len.max(src.len());
                            map.insert(bytes_to_code(src), utf16be_to_string(dst));
                        }
                        i += 2;
                    }
                }
                Token::Word(w) if w == "beginbfrange" => {
                    i += 1;
                    while i + 2 < tokens.len() && !is_word(&tokens[i], "endbfrange") {
                        let (Token::Hex(lo), Token::Hex(hi)) = (&tokens[i], &tokens[i + 1]) else {
                            i += 1;
                            continue;
                        };
                        code_len = code_len.max(lo.len());
                        let (start, end) = (bytes_to_code(lo), bytes_to_code(hi));
                        i += 2;

                        match &tokens[i] {
                            Token::Hex(dst) => {
                                let base = utf16be_to_string(dst);
                                let mut chars: Vec<char> = base.chars().collect();
                                for code in start..=end.min(start.saturating_add(0xFFFF)) {
                                    map.insert(code, chars.iter().collect());
                                    if let Some(last) = chars.last_mut() {
                                        *last = char::from_u32(*last as u32 + 1).unwrap_or('\u{FFFD}');
                                    }
                                }
                                i += 1;
                            }
                            Token::OpenArray => {
                                i += 1;
                                let mut code = start;
                                while i < tokens.len() && tokens[i] != Token::CloseArray {
                                    if let Token::Hex(dst) = &tokens[i] {
                                        if code <= end {
                                            map.insert(code, utf16be_to_string(dst));
                                        }
                                        code = code.saturating_add(1);
                                    }
                                    i += 1;
                                }
                                i += 1;
                            }
                            _ => i += 1,
                        }
                    }
                }
                _ => {}
            }
            i += 1;
        }

        Self { map, code_len: code_len.clamp(1, 4) }
    }

    /// Width in bytes of a character code
    pub fn code_len(&self) -> usize {
        self.code_len.max(1)
    }

    pub fn lookup(&self, code: u32) -> Option<&str> {
        self.map.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn is_word(token: &Token, word: &str) -> bool {
    matches!(token, Token::Word(w) if w == word)
}

pub(crate) fn bytes_to_code(bytes: &[u8]) -> u32 {
    bytes.iter().take(4).fold(0u32, |acc, b| (acc << 8) | *b as u32)
}

fn utf16be_to_string(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [single] => *single as u16,
            _ => 0,
        })
        .collect();
    String::from_utf16_lossy(&units)
}

fn tokenize(data: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];
        match byte {
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b'<' if data.get(i + 1) == Some(&b'<') => i += 2,
            b'>' if data.get(i + 1) == Some(&b'>') => i += 2,
            b'<' => {
                let start = i + 1;
                i = start;
                while i < data.len() && data[i] != b'>' {
                    i += 1;
                }
                tokens.push(Token::Hex(decode_hex(&data[start..i.min(data.len())])));
                i += 1;
            }
            b'[' => {
                tokens.push(Token::OpenArray);
                i += 1;
            }
            b']' => {
                tokens.push(Token::CloseArray);
                i += 1;
            }
            b if b.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                while i < data.len()
                    && !data[i].is_ascii_whitespace()
                    && !matches!(data[i], b'<' | b'>' | b'[' | b']' | b'%')
                {
                    i += 1;
                }
                tokens.push(Token::Word(String::from_utf8_lossy(&data[start..i]).into_owned()));
            }
        }
    }

    tokens
}

fn decode_hex(digits: &[u8]) -> Vec<u8> {
    let nibbles: Vec<u8> = digits
        .iter()
        .filter_map(|d| (*d as char).to_digit(16).map(|v| v as u8))
        .collect();
    nibbles
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => (hi << 4) | lo,
            [hi] => hi << 4,
            _ => 0,
        })
        .collect()
}
