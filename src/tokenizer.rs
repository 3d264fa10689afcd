use crate::error::{Error, Result};

/// Represents the smallest meaningful units (atoms) of the SQL language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // --- SQL Keywords ---
    Create,
    Use,
    Database,
    Table,
    Drop,
    Insert,
    Into,
    Values,
    Select,
    From,
    Where,
    Update,
    Set,
    Delete,
    Inner,
    Join,
    On,
    And,
    Or,

    // --- Data Types ---
    Integer,
    Float,
    Text,

    // --- Identifiers & Literals ---
    /// A name representing a table or a column (e.g., `users`, `id`).
    Identifier,
    /// An integer literal (e.g., `42`, `-7`).
    IntegerLiteral,
    /// A floating-point literal (e.g., `3.14`).
    FloatLiteral,
    /// A string literal, written between single quotes (e.g., `'Alice'`).
    StringLiteral,

    // --- Symbols ---
    /// Left parenthesis `(`
    LeftParen,
    /// Right parenthesis `)`
    RightParen,
    /// Comma `,`
    Comma,
    /// Semicolon `;`
    Semicolon,
    /// Dot `.` separating a table qualifier from a column name
    Dot,
    /// Multiplication or wildcard symbol `*`
    Star,
    /// Plus `+`
    Plus,
    /// Minus `-`
    Minus,
    /// Equal to `=`
    Equal,
    /// Not equal to `!=`
    NotEqual,
    /// Lower than `<`
    Less,
    /// Lower than or equal `<=`
    LessEq,
    /// Greater than `>`
    Greater,
    /// Greater than or equal `>=`
    GreaterEq,

    // --- Special ---
    /// Represents the End Of File/Input.
    Eof,
}

/// One token with its original text and 1-based source position.
/// Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            column,
        }
    }
}

/// True for tokens that can end an expression. A `-` right after one of
/// these is always the binary minus operator, never the sign of a literal,
/// so `col-1` tokenizes as a subtraction while `VALUES (-5)` and
/// `SET a = -1` keep their negative literals.
fn ends_expression(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Identifier
            | TokenKind::IntegerLiteral
            | TokenKind::FloatLiteral
            | TokenKind::StringLiteral
            | TokenKind::RightParen
    )
}

/// A lexical scanner that converts one statement's raw SQL text into a
/// sequence of [Token]s, tracking 1-based line and column positions.
///
/// Whitespace and `--` line comments are skipped. Keywords are matched
/// case-insensitively; identifiers preserve their original case.
pub struct Lexer {
    /// The input string stored as a vector of characters for easy iteration.
    input: Vec<char>,
    /// The current position in the character vector.
    position: usize,
    /// Current 1-based line, seeded with the statement's starting line.
    line: usize,
    /// Current 1-based column within the line.
    column: usize,
}

impl Lexer {
    /// Creates a new Lexer for one statement's text. `start_line` is the
    /// 1-based line of the statement within its script, so reported
    /// positions match the source file.
    pub fn new(input: &str, start_line: usize) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: start_line,
            column: 1,
        }
    }

    /// Processes the entire input and returns the token sequence,
    /// terminated by an [TokenKind::Eof] token.
    ///
    /// # Errors
    /// Returns a lexical error for an unrecognized character, a number
    /// with more than one dot, or an unterminated string literal.
    ///
    /// # Example
    /// ```
    /// # use minidb::tokenizer::{Lexer, TokenKind};
    /// let tokens = Lexer::new("SELECT * FROM users", 1).tokenize().unwrap();
    /// assert_eq!(tokens[0].kind, TokenKind::Select);
    /// assert_eq!(tokens[1].kind, TokenKind::Star);
    /// ```
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens: Vec<Token> = Vec::new();

        loop {
            self.skip_whitespace_and_comments();
            if self.is_at_end() {
                break;
            }

            let prev = tokens.last().map(|t| t.kind);
            let token = self.next_token(prev)?;
            tokens.push(token);
        }

        tokens.push(Token::new(TokenKind::Eof, "", self.line, self.column));
        Ok(tokens)
    }

    /// Identifies the next token based on the character at the current position.
    fn next_token(&mut self, prev: Option<TokenKind>) -> Result<Token> {
        let (line, column) = (self.line, self.column);
        let ch = self.current_char();

        match ch {
            '(' => Ok(self.single(TokenKind::LeftParen, line, column)),
            ')' => Ok(self.single(TokenKind::RightParen, line, column)),
            ',' => Ok(self.single(TokenKind::Comma, line, column)),
            ';' => Ok(self.single(TokenKind::Semicolon, line, column)),
            '.' => Ok(self.single(TokenKind::Dot, line, column)),
            '*' => Ok(self.single(TokenKind::Star, line, column)),
            '+' => Ok(self.single(TokenKind::Plus, line, column)),
            '=' => Ok(self.single(TokenKind::Equal, line, column)),
            '>' => {
                self.advance();
                if !self.is_at_end() && self.current_char() == '=' {
                    self.advance();
                    Ok(Token::new(TokenKind::GreaterEq, ">=", line, column))
                } else {
                    Ok(Token::new(TokenKind::Greater, ">", line, column))
                }
            }
            '<' => {
                self.advance();
                if !self.is_at_end() && self.current_char() == '=' {
                    self.advance();
                    Ok(Token::new(TokenKind::LessEq, "<=", line, column))
                } else {
                    Ok(Token::new(TokenKind::Less, "<", line, column))
                }
            }
            '!' => {
                self.advance();
                if !self.is_at_end() && self.current_char() == '=' {
                    self.advance();
                    Ok(Token::new(TokenKind::NotEqual, "!=", line, column))
                } else {
                    Err(Error::Lexical {
                        message: "expected '=' after '!'".into(),
                        line,
                        column,
                    })
                }
            }
            '-' => {
                // Sign of a numeric literal only where no expression can
                // end; otherwise the binary minus operator.
                let next_is_digit = self
                    .peek_next()
                    .map(|c| c.is_ascii_digit())
                    .unwrap_or(false);
                if next_is_digit && !prev.map(ends_expression).unwrap_or(false) {
                    self.advance();
                    self.read_number(true, line, column)
                } else {
                    Ok(self.single(TokenKind::Minus, line, column))
                }
            }
            '\'' => self.read_string(line, column),
            c if c.is_ascii_alphabetic() || c == '_' => Ok(self.read_identifier(line, column)),
            c if c.is_ascii_digit() => self.read_number(false, line, column),
            c => Err(Error::Lexical {
                message: format!("character {:?} is not supported", c),
                line,
                column,
            }),
        }
    }

    // --- Navigation Helpers ---

    /// Returns the character at the current position.
    fn current_char(&self) -> char {
        self.input[self.position]
    }

    /// Returns the character after the current one, if any.
    fn peek_next(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    /// Moves the cursor forward by one character, updating line/column.
    fn advance(&mut self) {
        if self.current_char() == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.position += 1;
    }

    /// Checks if the cursor has reached the end of the input.
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Consumes whitespace and `--` line comments.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while !self.is_at_end() && self.current_char().is_whitespace() {
                self.advance();
            }
            if !self.is_at_end() && self.current_char() == '-' && self.peek_next() == Some('-') {
                while !self.is_at_end() && self.current_char() != '\n' {
                    self.advance();
                }
                continue;
            }
            break;
        }
    }

    /// Consumes one character and builds its token.
    fn single(&mut self, kind: TokenKind, line: usize, column: usize) -> Token {
        let text = self.current_char().to_string();
        self.advance();
        Token::new(kind, text, line, column)
    }

    // --- Extraction Logic ---

    /// Reads a maximal run of letters, digits and underscores and determines
    /// if it is a reserved SQL keyword or a user-defined identifier.
    ///
    /// Keywords are matched case-insensitively.
    fn read_identifier(&mut self, line: usize, column: usize) -> Token {
        let mut ident = String::new();

        while !self.is_at_end()
            && (self.current_char().is_ascii_alphanumeric() || self.current_char() == '_')
        {
            ident.push(self.current_char());
            self.advance();
        }

        let kind = match ident.to_uppercase().as_str() {
            "CREATE" => TokenKind::Create,
            "USE" => TokenKind::Use,
            "DATABASE" => TokenKind::Database,
            "TABLE" => TokenKind::Table,
            "DROP" => TokenKind::Drop,
            "INSERT" => TokenKind::Insert,
            "INTO" => TokenKind::Into,
            "VALUES" => TokenKind::Values,
            "SELECT" => TokenKind::Select,
            "FROM" => TokenKind::From,
            "WHERE" => TokenKind::Where,
            "UPDATE" => TokenKind::Update,
            "SET" => TokenKind::Set,
            "DELETE" => TokenKind::Delete,
            "INNER" => TokenKind::Inner,
            "JOIN" => TokenKind::Join,
            "ON" => TokenKind::On,
            "AND" => TokenKind::And,
            "OR" => TokenKind::Or,
            "INTEGER" => TokenKind::Integer,
            "FLOAT" => TokenKind::Float,
            "TEXT" => TokenKind::Text,
            _ => TokenKind::Identifier,
        };

        Token::new(kind, ident, line, column)
    }

    /// Reads a numeric literal: a maximal run of digits with at most one
    /// dot. A second dot is a lexical error. `negative` means the caller
    /// already consumed a leading minus sign.
    fn read_number(&mut self, negative: bool, line: usize, column: usize) -> Result<Token> {
        let mut number = String::new();
        if negative {
            number.push('-');
        }
        let mut has_dot = false;

        while !self.is_at_end()
            && (self.current_char().is_ascii_digit() || (self.current_char() == '.' && !has_dot))
        {
            if self.current_char() == '.' {
                has_dot = true;
            }
            number.push(self.current_char());
            self.advance();
        }

        if !self.is_at_end() && self.current_char() == '.' {
            return Err(Error::Lexical {
                message: format!("number {:?} has more than one decimal point", number),
                line,
                column,
            });
        }

        let kind = if has_dot {
            TokenKind::FloatLiteral
        } else {
            TokenKind::IntegerLiteral
        };
        Ok(Token::new(kind, number, line, column))
    }

    /// Reads a string literal enclosed in single quotes. Any character up
    /// to the closing quote is content, including newlines.
    fn read_string(&mut self, line: usize, column: usize) -> Result<Token> {
        self.advance(); // Skip the opening quote

        let mut string = String::new();
        while !self.is_at_end() && self.current_char() != '\'' {
            string.push(self.current_char());
            self.advance();
        }

        if self.is_at_end() {
            // Report the opening quote, not wherever the input ran out.
            return Err(Error::Lexical {
                message: "unterminated string literal".into(),
                line,
                column,
            });
        }

        // Skip the closing quote
        self.advance();

        Ok(Token::new(TokenKind::StringLiteral, string, line, column))
    }
}
