//! `build.gradle` surgery around the first `android { ... }` block
//!
//! The block is located by scanning for the word `android` followed by
//! optional whitespace and `{`, then counting braces until depth returns to
//! zero. Braces inside comments and string literals do not count.

/// Why a block could not be located
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockError {
    Missing,
    Unbalanced,
}

/// Byte offsets of a located `android` block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AndroidBlock {
    /// Offset of the `a` in `android`
    pub start: usize,
    /// Offset of the opening `{`
    pub open: usize,
    /// Offset of the matching `}`
    pub close: usize,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    Code,
    LineComment,
    BlockComment,
    Quoted(char),
}

/// Characters that are code (not comment or string content), with offsets.
///
/// A block comment is reported as a single space so it still separates words.
fn code_chars(src: &str) -> Vec<(usize, char)> {
    let mut out = Vec::with_capacity(src.len());
    let mut state = Scan::Code;
    let mut chars = src.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match state {
            Scan::Code => match c {
                '/' if matches!(chars.peek(), Some((_, '/'))) => {
                    chars.next();
                    state = Scan::LineComment;
                }
                '/' if matches!(chars.peek(), Some((_, '*'))) => {
                    chars.next();
                    out.push((i, ' '));
                    state = Scan::BlockComment;
                }
                '"' | '\'' => state = Scan::Quoted(c),
                _ => out.push((i, c)),
            },
            Scan::LineComment => {
                if c == '\n' {
                    out.push((i, c));
                    state = Scan::Code;
                }
            }
            Scan::BlockComment => {
                if c == '*' && matches!(chars.peek(), Some((_, '/'))) {
                    chars.next();
                    state = Scan::Code;
                }
            }
            Scan::Quoted(quote) => {
                if c == '\\' {
                    chars.next();
                } else if c == quote {
                    state = Scan::Code;
                }
            }
        }
    }
    out
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Index into `code` of the `{` that opens the first `android` block
fn find_keyword_brace(code: &[(usize, char)], keyword: &str) -> Option<usize> {
    let word: Vec<char> = keyword.chars().collect();

    (0..code.len()).find_map(|i| {
        if i > 0 && is_ident(code[i - 1].1) {
            return None;
        }
        let matches_word = code
            .get(i..i + word.len())
            .is_some_and(|s| s.iter().map(|&(_, c)| c).eq(word.iter().copied()));
        if !matches_word {
            return None;
        }

        let mut j = i + word.len();
        while j < code.len() && code[j].1.is_whitespace() {
            j += 1;
        }
        (j < code.len() && code[j].1 == '{').then_some(j)
    })
}

/// Locate the first `android { ... }` block
pub fn find_android_block(src: &str) -> Result<AndroidBlock, BlockError> {
    let code = code_chars(src);
    let open = find_keyword_brace(&code, "android").ok_or(BlockError::Missing)?;
    let start = code[..open]
        .iter()
        .rev()
        .find(|&&(_, c)| !c.is_whitespace())
        .map(|&(pos, _)| pos + 1 - "android".len())
        .unwrap_or(0);

    let mut depth = 0usize;
    for &(pos, c) in &code[open..] {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(AndroidBlock {
                        start,
                        open: code[open].0,
                        close: pos,
                    });
                }
            }
            _ => {}
        }
    }
    Err(BlockError::Unbalanced)
}

/// Everything from the start of the file through the closing `}` of the block
pub fn head_through_android(src: &str) -> Result<&str, BlockError> {
    let block = find_android_block(src)?;
    Ok(&src[..=block.close])
}

/// Everything after the closing `}` of the block; the whole file when there is none
pub fn tail_after_android(src: &str) -> Result<&str, BlockError> {
    match find_android_block(src) {
        Ok(block) => Ok(&src[block.close + 1..]),
        Err(BlockError::Missing) => Ok(src),
        Err(e) => Err(e),
    }
}
