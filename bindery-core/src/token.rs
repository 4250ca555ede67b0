use std::{fmt, sync::Arc};

/// `attribute op` written right before a bind marker, as in `id = :ids`.
///
/// List inputs replace the whole comparison (`(id IN (1,2))`), so the tokenizer hands it over
/// instead of leaving it in the statement text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub attribute: String,
    pub op: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    ValueInput { path: String },
    ValueOutput { path: String },
    FunctionInput { name: String, args: Vec<String> },
    DialectLiteral { name: String },
}

/// One bind site of a statement, immutable once tokenized.
///
/// The text a token is replaced with lives in the scratch of each processor, not here, so the
/// same statement can be processed concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Text of the marker as found in the statement, used for diagnostics.
    pub parsed: String,
    pub batch: bool,
    pub plain_value: bool,
    pub plain_sql: bool,
    pub select_into: bool,
    pub comparison: Option<Comparison>,
}

impl Token {
    pub fn new(kind: TokenKind, parsed: impl Into<String>) -> Self {
        Self {
            kind,
            parsed: parsed.into(),
            batch: false,
            plain_value: false,
            plain_sql: false,
            select_into: false,
            comparison: None,
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::ValueInput { .. } | TokenKind::FunctionInput { .. }
        )
    }

    pub fn is_output(&self) -> bool {
        matches!(self.kind, TokenKind::ValueOutput { .. })
    }

    /// The dotted path, or the function/literal name.
    pub fn name(&self) -> &str {
        match &self.kind {
            TokenKind::ValueInput { path } | TokenKind::ValueOutput { path } => path,
            TokenKind::FunctionInput { name, .. } | TokenKind::DialectLiteral { name } => name,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parsed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    /// Index into `ParsedStatement::tokens`.
    Token(usize),
}

/// Output of the tokenizer: statement text split around its bind sites.
///
/// `tokens` are the sites that appear in the text, in order. `into` are the select-into outputs,
/// which have been removed from the text and receive the result columns by position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedStatement {
    pub original: String,
    pub parts: Vec<Part>,
    pub tokens: Vec<Arc<Token>>,
    pub into: Vec<Arc<Token>>,
}

impl ParsedStatement {
    /// Plain statement without any bind site.
    pub fn text(sql: impl Into<String>) -> Self {
        TemplateBuilder::new().text(sql).build()
    }

    /// Statement text with every token replaced by the corresponding entry of `replacements`.
    pub fn render(&self, replacements: &[Option<String>]) -> String {
        let mut out = String::with_capacity(self.original.len());
        for part in &self.parts {
            match part {
                Part::Text(v) => out.push_str(v),
                Part::Token(i) => {
                    if let Some(Some(v)) = replacements.get(*i) {
                        out.push_str(v);
                    }
                }
            }
        }
        out
    }
}

/// Builds a [`ParsedStatement`] programmatically.
///
/// ```rust
/// use bindery_core::TemplateBuilder;
/// let statement = TemplateBuilder::new()
///     .text("SELECT name FROM person WHERE ")
///     .input_cmp("id", "=", "ids")
///     .build();
/// assert_eq!(statement.original, "SELECT name FROM person WHERE id = :ids");
/// ```
#[derive(Debug, Default)]
pub struct TemplateBuilder {
    statement: ParsedStatement,
}

impl TemplateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.statement.original.push_str(&text);
        match self.statement.parts.last_mut() {
            Some(Part::Text(last)) => last.push_str(&text),
            _ => self.statement.parts.push(Part::Text(text)),
        }
        self
    }

    /// Appends any token to the text.
    pub fn token(mut self, token: Token) -> Self {
        match &token.comparison {
            Some(c) => {
                self.statement.original.push_str(&c.attribute);
                self.statement.original.push(' ');
                self.statement.original.push_str(&c.op);
                self.statement.original.push(' ');
            }
            None => {}
        }
        self.statement.original.push_str(&token.parsed);
        self.statement
            .parts
            .push(Part::Token(self.statement.tokens.len()));
        self.statement.tokens.push(Arc::new(token));
        self
    }

    /// `:path`
    pub fn input(self, path: &str) -> Self {
        self.token(Token::new(
            TokenKind::ValueInput { path: path.into() },
            format!(":{path}"),
        ))
    }

    /// `attribute op :path`, the comparison is rewritten when the input is a list.
    pub fn input_cmp(self, attribute: &str, op: &str, path: &str) -> Self {
        let mut token = Token::new(
            TokenKind::ValueInput { path: path.into() },
            format!(":{path}"),
        );
        token.comparison = Some(Comparison {
            attribute: attribute.into(),
            op: op.into(),
        });
        self.token(token)
    }

    /// `:{path}`, one execution per element.
    pub fn batch_input(self, path: &str) -> Self {
        let mut token = Token::new(
            TokenKind::ValueInput { path: path.into() },
            format!(":{{{path}}}"),
        );
        token.batch = true;
        self.token(token)
    }

    /// `#path#`, rendered as a literal.
    pub fn plain_value(self, path: &str) -> Self {
        let mut token = Token::new(
            TokenKind::ValueInput { path: path.into() },
            format!("#{path}#"),
        );
        token.plain_value = true;
        self.token(token)
    }

    /// `&path&`, rendered as raw SQL text.
    pub fn plain_sql(self, path: &str) -> Self {
        let mut token = Token::new(
            TokenKind::ValueInput { path: path.into() },
            format!("&{path}&"),
        );
        token.plain_sql = true;
        self.token(token)
    }

    /// `:path` as output parameter of a stored procedure.
    pub fn output(self, path: &str) -> Self {
        self.token(Token::new(
            TokenKind::ValueOutput { path: path.into() },
            format!(":{path}"),
        ))
    }

    /// `INTO :path`, receives the next result column. Does not appear in the text.
    pub fn select_into(mut self, path: &str) -> Self {
        let mut token = Token::new(
            TokenKind::ValueOutput { path: path.into() },
            format!(":{path}"),
        );
        token.select_into = true;
        if self.statement.into.is_empty() {
            self.statement.original.push_str(" INTO ");
        } else {
            self.statement.original.push_str(", ");
        }
        self.statement.original.push_str(&token.parsed);
        self.statement.into.push(Arc::new(token));
        self
    }

    /// `::name(arg, ...)`, value computed by the function resolver.
    pub fn function(self, name: &str, args: &[&str]) -> Self {
        let parsed = format!("::{name}({})", args.join(", "));
        self.token(Token::new(
            TokenKind::FunctionInput {
                name: name.into(),
                args: args.iter().map(|v| v.to_string()).collect(),
            },
            parsed,
        ))
    }

    /// `$$name`, replaced by the vendor spelling of `name`.
    pub fn dialect_literal(self, name: &str) -> Self {
        self.token(Token::new(
            TokenKind::DialectLiteral { name: name.into() },
            format!("$${name}"),
        ))
    }

    pub fn build(self) -> ParsedStatement {
        self.statement
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_text_and_tokens_in_order() {
        let statement = TemplateBuilder::new()
            .text("UPDATE t SET v = ")
            .batch_input("v")
            .text(" WHERE ")
            .text("id = ")
            .batch_input("id")
            .build();
        assert_eq!(statement.original, "UPDATE t SET v = :{v} WHERE id = :{id}");
        assert_eq!(statement.parts.len(), 4);
        assert_eq!(statement.tokens.len(), 2);
        assert!(statement.tokens.iter().all(|t| t.batch && t.is_input()));
        let rendered = statement.render(&[Some("?".into()), Some("?".into())]);
        assert_eq!(rendered, "UPDATE t SET v = ? WHERE id = ?");
    }

    #[test]
    fn select_into_is_not_in_text() {
        let statement = TemplateBuilder::new()
            .text("SELECT a, b FROM t")
            .select_into("first")
            .select_into("second")
            .build();
        assert_eq!(statement.original, "SELECT a, b FROM t INTO :first, :second");
        assert_eq!(statement.render(&[]), "SELECT a, b FROM t");
        assert_eq!(statement.into.len(), 2);
        assert!(statement.into[0].select_into);
    }
}
