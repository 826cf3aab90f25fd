//! Recursive descent parser implementation

use sift_ast::*;
use sift_lexer::{unescape, Token, TokenKind};
use tracing::trace;

use crate::ParseError;

pub struct Parser<'a> {
    source: &'a str,
    /// Tokens with lexical error tokens removed; always ends with `Eof`
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
    clause_spans: Vec<(ClauseKind, Span)>,
}

impl<'a> Parser<'a> {
    /// Create a parser. Error tokens are reported up front and dropped from
    /// the stream the grammar sees.
    pub fn new(source: &'a str, tokens: &[Token]) -> Self {
        let mut errors = Vec::new();
        let mut kept = Vec::with_capacity(tokens.len());
        for token in tokens {
            let span = token.span;
            match token.kind {
                TokenKind::UnterminatedString => errors.push(ParseError::UnterminatedString { span }),
                TokenKind::UnterminatedBracket => {
                    errors.push(ParseError::UnterminatedBracket { span })
                }
                TokenKind::Error => errors.push(ParseError::UnexpectedCharacter {
                    text: token.text(source).to_string(),
                    span,
                }),
                _ => kept.push(*token),
            }
        }
        if kept.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let end = source.len();
            kept.push(Token {
                kind: TokenKind::Eof,
                span: Span::new(end, end),
            });
        }

        Self {
            source,
            tokens: kept,
            pos: 0,
            errors,
            clause_spans: Vec::new(),
        }
    }

    /// Collected errors and the span of every clause that was parsed
    pub fn finish(self) -> (Vec<ParseError>, Vec<(ClauseKind, Span)>) {
        (self.errors, self.clause_spans)
    }

    // === Utilities ===

    fn current(&self) -> Token {
        let end = self.source.len();
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .copied()
            .unwrap_or(Token {
                kind: TokenKind::Eof,
                span: Span::new(end, end),
            })
    }

    fn peek(&self) -> TokenKind {
        self.current().kind
    }

    fn peek_token(&self, n: usize) -> Option<Token> {
        self.tokens.get(self.pos + n).copied()
    }

    fn peek_ahead(&self, n: usize) -> TokenKind {
        self.peek_token(n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.current();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek() == kind
    }

    fn consume(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.expected(kind.describe()))
        }
    }

    fn text(&self, token: Token) -> &'a str {
        token.text(self.source)
    }

    fn span(&self) -> Span {
        self.current().span
    }

    /// End offset of the last consumed token
    fn prev_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|token| token.span.end)
            .unwrap_or(0)
    }

    fn at_clause_boundary(&self) -> bool {
        let kind = self.peek();
        kind == TokenKind::Eof || kind.starts_clause()
    }

    fn ends_condition(kind: TokenKind) -> bool {
        kind == TokenKind::Eof || kind == TokenKind::RParen || kind.starts_clause()
    }

    /// "missing X" at a boundary, "expected X, found Y" elsewhere
    fn expected(&self, what: &str) -> ParseError {
        let token = self.current();
        if Self::ends_condition(token.kind) || token.kind.is_connector() {
            ParseError::missing(what, token.span)
        } else {
            ParseError::unexpected(what, token.kind, token.span)
        }
    }

    fn error(&mut self, error: ParseError) {
        trace!(offset = error.offset(), %error, "recorded parse error");
        self.errors.push(error);
    }

    fn skip_to_clause(&mut self) {
        while !self.at_clause_boundary() {
            self.advance();
        }
    }

    // === Query ===

    pub fn parse_query(&mut self) -> ClauseSet {
        let mut clauses = ClauseSet::default();
        let mut last: Option<ClauseKind> = None;

        while !self.at(TokenKind::Eof) {
            let start = self.span();
            let kind = match self.peek() {
                TokenKind::Select => ClauseKind::Select,
                TokenKind::Where => ClauseKind::Where,
                TokenKind::Group => ClauseKind::GroupBy,
                TokenKind::Having => ClauseKind::Having,
                TokenKind::Order => ClauseKind::OrderBy,
                TokenKind::Limit => ClauseKind::Limit,
                found => {
                    self.error(ParseError::unexpected("a clause keyword", found, start));
                    self.advance();
                    self.skip_to_clause();
                    continue;
                }
            };

            if last.is_some_and(|previous| previous >= kind) {
                self.error(ParseError::MisplacedClause {
                    clause: kind.keyword(),
                    span: start,
                });
            }
            last = Some(kind);

            match self.parse_clause(kind, &mut clauses) {
                Ok(()) if !self.at_clause_boundary() => {
                    let token = self.current();
                    self.error(ParseError::unexpected(
                        "',' or a clause keyword",
                        token.kind,
                        token.span,
                    ));
                    self.skip_to_clause();
                }
                Ok(()) => {}
                Err(error) => {
                    self.error(error);
                    self.skip_to_clause();
                }
            }

            let span = Span::new(start.start, self.prev_end().max(start.end));
            self.clause_spans.push((kind, span));
        }

        clauses
    }

    /// Parse a bare condition (no clause keywords)
    pub fn parse_fragment(&mut self) -> Option<ConditionTree> {
        if self.at(TokenKind::Eof) {
            return None;
        }
        let tree = self.parse_condition();
        if !self.at(TokenKind::Eof) {
            let token = self.current();
            self.error(ParseError::unexpected("end of condition", token.kind, token.span));
        }
        self.clause_spans
            .push((ClauseKind::Where, Span::new(0, self.source.len())));
        tree
    }

    fn parse_clause(&mut self, kind: ClauseKind, clauses: &mut ClauseSet) -> Result<(), ParseError> {
        self.advance();
        match kind {
            ClauseKind::Select => self.parse_select_list(&mut clauses.select),
            ClauseKind::Where => {
                clauses.where_clause = self.parse_condition();
                Ok(())
            }
            ClauseKind::GroupBy => {
                self.consume(TokenKind::By)?;
                self.parse_property_list(&mut clauses.group_by)
            }
            ClauseKind::Having => {
                clauses.having = self.parse_condition();
                Ok(())
            }
            ClauseKind::OrderBy => {
                self.consume(TokenKind::By)?;
                self.parse_order_list(&mut clauses.order_by)
            }
            ClauseKind::Limit => {
                clauses.limit = Some(self.parse_limit()?);
                Ok(())
            }
        }
    }

    // === SELECT / GROUP BY / ORDER BY / LIMIT ===

    fn parse_select_list(&mut self, items: &mut Vec<SelectItem>) -> Result<(), ParseError> {
        loop {
            items.push(self.parse_select_item()?);
            if !self.at(TokenKind::Comma) {
                return Ok(());
            }
            self.advance();
        }
    }

    fn parse_select_item(&mut self) -> Result<SelectItem, ParseError> {
        let start = self.span();
        let expr = match self.peek() {
            TokenKind::Star => {
                self.advance();
                SelectExpr::All
            }
            TokenKind::Ident if self.peek_ahead(1) == TokenKind::LParen => {
                let name_token = self.advance();
                let name = self.text(name_token);
                let function = Aggregate::from_name(name).ok_or_else(|| ParseError::UnknownFunction {
                    name: name.to_string(),
                    span: name_token.span,
                })?;
                let open = self.advance();
                let property = self.parse_property()?;
                self.close_paren(open)?;
                SelectExpr::Aggregate { function, property }
            }
            _ => SelectExpr::Property(self.parse_property()?),
        };

        let alias = if self.at(TokenKind::As) {
            self.advance();
            Some(self.parse_alias()?)
        } else {
            None
        };

        Ok(SelectItem {
            expr,
            alias,
            span: Span::new(start.start, self.prev_end()),
        })
    }

    fn parse_alias(&mut self) -> Result<String, ParseError> {
        let token = self.current();
        let text = self.text(token);
        let alias = match token.kind {
            TokenKind::String => unescape(&text[1..text.len() - 1]),
            TokenKind::Ident | TokenKind::Path => text.to_string(),
            _ => return Err(self.expected("an alias")),
        };
        self.advance();
        Ok(alias)
    }

    fn parse_property(&mut self) -> Result<PropertyRef, ParseError> {
        let token = self.current();
        let text = self.text(token);
        let (source, bracketed) = match token.kind {
            TokenKind::Ident | TokenKind::Path => (text.to_string(), false),
            TokenKind::Bracketed => (text[1..text.len() - 1].to_string(), true),
            TokenKind::Dollar => (WILDCARD.to_string(), false),
            _ => return Err(self.expected("a property")),
        };
        self.advance();
        Ok(PropertyRef {
            source,
            bracketed,
            span: token.span,
        })
    }

    fn parse_property_list(&mut self, items: &mut Vec<PropertyRef>) -> Result<(), ParseError> {
        loop {
            items.push(self.parse_property()?);
            if !self.at(TokenKind::Comma) {
                return Ok(());
            }
            self.advance();
        }
    }

    fn parse_order_list(&mut self, items: &mut Vec<OrderItem>) -> Result<(), ParseError> {
        loop {
            let property = self.parse_property()?;
            let direction = match self.peek() {
                TokenKind::Asc => Some(OrderDirection::Asc),
                TokenKind::Desc => Some(OrderDirection::Desc),
                _ => None,
            };
            if direction.is_some() {
                self.advance();
            }
            items.push(OrderItem {
                span: Span::new(property.span.start, self.prev_end()),
                property,
                direction,
            });

            if self.at(TokenKind::Comma) {
                self.advance();
                continue;
            }
            if !self.at_clause_boundary() {
                let token = self.advance();
                let found = self.text(token).to_string();
                self.error(ParseError::InvalidSortDirection {
                    found,
                    span: token.span,
                });
                self.skip_to_clause();
            }
            return Ok(());
        }
    }

    fn parse_limit(&mut self) -> Result<Limit, ParseError> {
        let token = self.current();
        let text = self.text(token);
        let invalid = || ParseError::InvalidLimit {
            found: text.to_string(),
            span: token.span,
        };
        let limit = match token.kind {
            TokenKind::Int => text.parse::<u64>().map(Limit::Count).map_err(|_| invalid())?,
            TokenKind::Ident if text.eq_ignore_ascii_case("infinity") => Limit::Infinity,
            kind if kind == TokenKind::Eof || kind.starts_clause() => {
                return Err(ParseError::missing("a LIMIT value", token.span))
            }
            _ => return Err(invalid()),
        };
        self.advance();
        Ok(limit)
    }

    fn close_paren(&mut self, open: Token) -> Result<(), ParseError> {
        if self.at(TokenKind::RParen) {
            self.advance();
            Ok(())
        } else if Self::ends_condition(self.peek()) {
            Err(ParseError::UnclosedParen { span: open.span })
        } else {
            Err(self.expected("')'"))
        }
    }

    // === Conditions ===

    /// Parse a WHERE/HAVING condition into canonical form. Errors are
    /// recorded; whatever parsed cleanly is kept.
    fn parse_condition(&mut self) -> Option<ConditionTree> {
        let mut raw = ConditionTree::new();
        let root = self.parse_level(&mut raw)?;
        raw.set_root(root);

        let tree = raw.normalized();
        if let Some(id) = tree.find_double_negation() {
            self.error(ParseError::DoubleNegation { span: tree.span(id) });
        }
        (!tree.is_empty()).then_some(tree)
    }

    /// One parenthesis level: terms joined by AND / OR / `&&` / `||` / `,`
    fn parse_level(&mut self, tree: &mut ConditionTree) -> Option<NodeId> {
        let mut terms = Vec::new();
        let mut connectors = Vec::new();

        loop {
            terms.push(self.parse_term(tree));
            let connector = match self.peek() {
                TokenKind::And | TokenKind::AndAnd => Some(GroupKind::And),
                TokenKind::Or | TokenKind::OrOr => Some(GroupKind::Or),
                TokenKind::Comma => None,
                kind if Self::ends_condition(kind) => break,
                found => {
                    // Two terms with no connector: report, then read on as AND
                    let span = self.span();
                    self.error(ParseError::unexpected("AND, OR or ','", found, span));
                    connectors.push(Some(GroupKind::And));
                    continue;
                }
            };
            self.advance();
            connectors.push(connector);
        }

        let connectors = resolve_commas(&connectors);
        build_level(tree, terms, &connectors)
    }

    fn parse_term(&mut self, tree: &mut ConditionTree) -> Option<NodeId> {
        match self.parse_unary(tree) {
            Ok(node) => node,
            Err(error) => {
                self.error(error);
                // Resynchronize on the next connector or the end of the level
                while !Self::ends_condition(self.peek()) && !self.peek().is_connector() {
                    self.advance();
                }
                None
            }
        }
    }

    /// `Ok(None)` means the term produced nothing and its errors are
    /// already recorded.
    fn parse_unary(&mut self, tree: &mut ConditionTree) -> Result<Option<NodeId>, ParseError> {
        let start = self.span();
        match self.peek() {
            TokenKind::Not => {
                self.advance();
                let operand = self.parse_unary(tree)?;
                Ok(operand.map(|child| tree.add_not(child, Span::new(start.start, self.prev_end()))))
            }
            TokenKind::LParen => {
                let open = self.advance();
                let inner = self.parse_level(tree);
                if self.at(TokenKind::RParen) {
                    self.advance();
                } else {
                    self.error(ParseError::UnclosedParen { span: open.span });
                }
                Ok(inner)
            }
            kind if Self::ends_condition(kind) || kind.is_connector() => {
                Err(ParseError::missing("a condition", start))
            }
            _ => self.parse_comparison(tree).map(Some),
        }
    }

    fn parse_comparison(&mut self, tree: &mut ConditionTree) -> Result<NodeId, ParseError> {
        let property = self.parse_property()?;
        let op = self.parse_operator()?;
        let values = match op.arity() {
            Arity::One => vec![self.parse_value()?],
            Arity::Two => {
                let low = self.parse_value()?;
                self.consume(TokenKind::And)?;
                let high = self.parse_value()?;
                vec![low, high]
            }
            Arity::Many => self.parse_value_list()?,
        };

        let span = Span::new(property.span.start, self.prev_end());
        let comparison = Comparison::new(op, property, values);
        comparison
            .check()
            .map_err(|error| ParseError::InvalidComparison { error, span })?;
        Ok(tree.add_compare(comparison, span))
    }

    fn parse_operator(&mut self) -> Result<ComparisonOp, ParseError> {
        if self.at(TokenKind::Not) {
            if self.peek_ahead(1) == TokenKind::In {
                self.advance();
                self.advance();
                return Ok(ComparisonOp::NotIn);
            }
            let span = self.peek_token(1).map(|t| t.span).unwrap_or_else(|| self.span());
            return Err(ParseError::unexpected("IN after NOT", self.peek_ahead(1), span));
        }
        match self.peek().comparison_op() {
            Some(op) => {
                self.advance();
                Ok(op)
            }
            None => Err(self.expected("a comparison operator")),
        }
    }

    /// `(v, ...)` or a single unparenthesized value
    fn parse_value_list(&mut self) -> Result<Vec<Literal>, ParseError> {
        if !self.at(TokenKind::LParen) {
            return Ok(vec![self.parse_value()?]);
        }
        let open = self.advance();
        let mut values = vec![self.parse_value()?];
        while self.at(TokenKind::Comma) {
            self.advance();
            values.push(self.parse_value()?);
        }
        self.close_paren(open)?;
        Ok(values)
    }

    fn parse_value(&mut self) -> Result<Literal, ParseError> {
        let token = self.current();
        let text = self.text(token);
        let not_a_number = || ParseError::unexpected("a number", token.kind, token.span);
        let value = match token.kind {
            TokenKind::String => Literal::String(unescape(&text[1..text.len() - 1])),
            TokenKind::Int => match text.parse::<i64>() {
                Ok(n) => Literal::Int(n),
                Err(_) => Literal::Float(text.parse::<f64>().map_err(|_| not_a_number())?),
            },
            TokenKind::Float => Literal::Float(text.parse::<f64>().map_err(|_| not_a_number())?),
            TokenKind::True => Literal::Bool(true),
            TokenKind::False => Literal::Bool(false),
            TokenKind::Null => Literal::Null,
            // Barewords are promoted to strings
            TokenKind::Ident | TokenKind::Path => Literal::String(text.to_string()),
            _ => return Err(self.expected("a value")),
        };
        self.advance();
        Ok(value)
    }
}

/// Give every bare comma the meaning of the nearest explicit connector on
/// its level: the closest one before it, else the first one after it, else
/// AND.
fn resolve_commas(connectors: &[Option<GroupKind>]) -> Vec<GroupKind> {
    connectors
        .iter()
        .enumerate()
        .map(|(i, connector)| {
            connector
                .or_else(|| connectors[..i].iter().rev().flatten().next().copied())
                .or_else(|| connectors[i + 1..].iter().flatten().next().copied())
                .unwrap_or(GroupKind::And)
        })
        .collect()
}

/// Apply AND-over-OR precedence to one level's terms. Failed terms are
/// skipped; normalization later removes any redundant nesting.
fn build_level(
    tree: &mut ConditionTree,
    terms: Vec<Option<NodeId>>,
    connectors: &[GroupKind],
) -> Option<NodeId> {
    let mut runs: Vec<Vec<NodeId>> = vec![Vec::new()];
    for (i, term) in terms.into_iter().enumerate() {
        if i > 0 && connectors.get(i - 1) == Some(&GroupKind::Or) {
            runs.push(Vec::new());
        }
        if let (Some(id), Some(run)) = (term, runs.last_mut()) {
            run.push(id);
        }
    }

    let mut alternatives = Vec::new();
    for run in runs {
        match run.as_slice() {
            [] => {}
            [single] => alternatives.push(*single),
            [first, .., last] => {
                let span = tree.span(*first).merge(tree.span(*last));
                alternatives.push(tree.add_group(GroupKind::And, run.clone(), span));
            }
        }
    }

    match alternatives.as_slice() {
        [] => None,
        [single] => Some(*single),
        [first, .., last] => {
            let span = tree.span(*first).merge(tree.span(*last));
            Some(tree.add_group(GroupKind::Or, alternatives.clone(), span))
        }
    }
}
