use crate::ast::{Ast, BinaryOp, Literal, Mutability, UnaryOp};
use crate::error::ParseError;
use crate::span::{Span, Spanned};
use crate::token::{Token, Tokens};

/// Recursive-descent parser with precedence climbing for expressions.
/// Grounded on the teacher's `compiler/parse.rs` (`Prec` enum driving a
/// `rule_prefix`/`rule_infix` table); EmberScript's grammar has no macro
/// syntax to special-case, so the table collapses to a straightforward
/// ladder of `parse_*` methods instead of a rule table, but the
/// `advance`/`consume`/`check` helper shape is the same.
pub struct Parser {
    tokens: Tokens,
    pos: usize,
}

impl Parser {
    pub fn parse(tokens: Tokens) -> Result<Vec<Spanned<Ast>>, ParseError> {
        let mut parser = Parser { tokens, pos: 0 };
        let mut stmts = vec![];
        parser.skip_newlines();
        while !parser.at_eof() {
            stmts.push(parser.statement()?);
            parser.skip_newlines();
        }
        Ok(stmts)
    }

    // --- token stream helpers -------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].item
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let i = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[i].item
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].span.clone()
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    fn advance(&mut self) -> Spanned<Token> {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check_punct(&self, p: &str) -> bool {
        matches!(self.peek(), Token::Punctuation(s) if s == p)
    }

    fn check_op(&self, o: &str) -> bool {
        matches!(self.peek(), Token::Operator(s) if s == o)
    }

    fn check_keyword(&self, k: &str) -> bool {
        matches!(self.peek(), Token::Keyword(s) if s == k)
    }

    fn match_punct(&mut self, p: &str) -> bool {
        if self.check_punct(p) { self.advance(); true } else { false }
    }

    fn match_op(&mut self, o: &str) -> bool {
        if self.check_op(o) { self.advance(); true } else { false }
    }

    fn match_keyword(&mut self, k: &str) -> bool {
        if self.check_keyword(k) { self.advance(); true } else { false }
    }

    fn expect_punct(&mut self, p: &str) -> Result<(), ParseError> {
        if self.match_punct(p) { Ok(()) } else {
            Err(ParseError::UnexpectedToken { found: self.peek().to_string(), expected: format!("`{}`", p), span: self.current_span() })
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match self.peek().clone() {
            Token::Identifier(name) => { self.advance(); Ok(name) }
            other => Err(ParseError::UnexpectedToken { found: other.to_string(), expected: "identifier".into(), span: self.current_span() }),
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), Token::Newline) {
            self.advance();
        }
    }

    fn end_of_statement(&mut self) -> Result<(), ParseError> {
        if matches!(self.peek(), Token::Newline | Token::Eof | Token::Dedent) {
            self.skip_newlines();
            return Ok(());
        }
        if self.check_punct("}") {
            return Ok(());
        }
        Err(ParseError::MissingTerminator { what: "statement".into(), span: self.current_span() })
    }

    // --- statements -------------------------------------------------------

    fn statement(&mut self) -> Result<Spanned<Ast>, ParseError> {
        let start = self.current_span();

        if self.check_keyword("var") || self.check_keyword("let") || self.check_keyword("const") {
            return self.var_decl();
        }
        if self.check_keyword("if") {
            return self.if_stmt();
        }
        if self.check_keyword("while") {
            return self.while_stmt();
        }
        if self.check_keyword("for") {
            return self.for_stmt();
        }
        if self.check_keyword("import") {
            return self.import_stmt();
        }
        if matches!(self.peek(), Token::Identifier(_)) && matches!(self.peek_at(1), Token::Punctuation(p) if p == ":") {
            return self.bare_decl_fn_or_iterator();
        }

        let expr = self.expression()?;
        let span = Span::combine(&start, &expr.span);
        self.end_of_statement()?;
        Ok(self.expr_statement(expr, span))
    }

    /// `print(...)` parses to a regular call but is re-homed to `Ast::Print`
    /// so the compiler can special-case it without a name comparison at
    /// every call site.
    fn expr_statement(&self, expr: Spanned<Ast>, span: Span) -> Spanned<Ast> {
        match expr.item {
            Ast::FunctionCall { name, mut args } if name == "print" => {
                let arg = if args.is_empty() { Spanned::new(Ast::Literal(Literal::Null), span.clone()) } else { args.remove(0) };
                Spanned::new(Ast::Print(Box::new(arg)), span)
            }
            other => Spanned::new(other, span),
        }
    }

    fn var_decl(&mut self) -> Result<Spanned<Ast>, ParseError> {
        let start = self.current_span();
        let mutable = if self.match_keyword("var") {
            Mutability::Mutable
        } else if self.match_keyword("let") {
            Mutability::Immutable
        } else {
            self.advance(); // const
            Mutability::Const
        };
        let name = self.expect_identifier()?;
        self.expect_punct(":")?;
        let init = Some(Box::new(self.expression()?));
        let span = Span::combine(&start, &self.current_span());
        self.end_of_statement()?;
        Ok(Spanned::new(Ast::VarDecl { name, mutable, init }, span))
    }

    /// Handles the three forms that all start with `identifier ":"`:
    /// function definitions (`name: fn(...) body`), naked iterators
    /// (`name: iterable` followed by an indented body), and bare
    /// declarations (`name: expr`).
    fn bare_decl_fn_or_iterator(&mut self) -> Result<Spanned<Ast>, ParseError> {
        let start = self.current_span();
        let name = self.expect_identifier()?;
        self.expect_punct(":")?;

        if self.check_keyword("fn") {
            return self.function_def(name, start);
        }

        let expr = self.expression()?;

        if matches!(self.peek(), Token::Newline) && matches!(self.peek_at(1), Token::Indent) {
            self.advance(); // newline
            let body = self.indented_block()?;
            let span = Span::combine(&start, &body.span);
            return Ok(Spanned::new(Ast::NakedIterator { var: name, iterable: Box::new(expr), body: Box::new(body) }, span));
        }

        let span = Span::combine(&start, &expr.span);
        self.end_of_statement()?;
        Ok(Spanned::new(Ast::VarDecl { name, mutable: Mutability::Mutable, init: Some(Box::new(expr)) }, span))
    }

    fn function_def(&mut self, name: String, start: Span) -> Result<Spanned<Ast>, ParseError> {
        self.advance(); // `fn`
        self.expect_punct("(")?;
        let mut params = vec![];
        if !self.check_punct(")") {
            loop {
                params.push(self.expect_identifier()?);
                if !self.match_punct(",") { break; }
            }
        }
        self.expect_punct(")")?;

        // event-binding head `name: fn(params) <- [ ... ] body` — the
        // bracket is parsed and discarded; the callback runs as a plain
        // function (spec.md §6).
        if self.match_op("<-") {
            self.expect_punct("[")?;
            let mut depth = 1;
            while depth > 0 {
                if self.check_punct("[") { depth += 1; }
                if self.check_punct("]") { depth -= 1; }
                if matches!(self.peek(), Token::Eof) {
                    return Err(ParseError::UnexpectedEof { span: self.current_span() });
                }
                self.advance();
            }
        }

        let body = self.block()?;
        let span = Span::combine(&start, &body.span);
        Ok(Spanned::new(Ast::function_def(name, params, body), span))
    }

    fn if_stmt(&mut self) -> Result<Spanned<Ast>, ParseError> {
        let start = self.current_span();
        self.advance(); // if
        let condition = Box::new(self.expression()?);
        let then_branch = Box::new(self.block()?);
        let mut span = Span::combine(&start, &then_branch.span);

        let else_branch = if self.peek_is_else() {
            self.consume_else();
            let branch = if self.check_keyword("if") { self.if_stmt()? } else { self.block()? };
            span = Span::combine(&span, &branch.span);
            Some(Box::new(branch))
        } else {
            None
        };

        Ok(Spanned::new(Ast::If { condition, then_branch, else_branch }, span))
    }

    /// `else` may appear immediately or after a DEDENT that closed the
    /// preceding indented `if` body.
    fn peek_is_else(&self) -> bool {
        if self.check_keyword("else") { return true; }
        if matches!(self.peek(), Token::Dedent) && matches!(self.peek_at(1), Token::Keyword(k) if k == "else") {
            return true;
        }
        false
    }

    fn consume_else(&mut self) {
        if matches!(self.peek(), Token::Dedent) { self.advance(); }
        self.advance(); // else
    }

    fn while_stmt(&mut self) -> Result<Spanned<Ast>, ParseError> {
        let start = self.current_span();
        self.advance(); // while
        let condition = Box::new(self.expression()?);
        let body = Box::new(self.block()?);
        let span = Span::combine(&start, &body.span);
        Ok(Spanned::new(Ast::While { condition, body }, span))
    }

    fn for_stmt(&mut self) -> Result<Spanned<Ast>, ParseError> {
        let start = self.current_span();
        self.advance(); // for

        let init = if self.check_punct(";") { None } else { Some(Box::new(self.for_clause_stmt()?)) };
        self.expect_punct(";")?;
        let condition = if self.check_punct(";") { None } else { Some(Box::new(self.expression()?)) };
        self.expect_punct(";")?;
        let increment = if self.block_starts_here() { None } else { Some(Box::new(self.for_clause_stmt()?)) };

        let body = Box::new(self.block()?);
        let span = Span::combine(&start, &body.span);
        Ok(Spanned::new(Ast::For { init, condition, increment, body }, span))
    }

    fn block_starts_here(&self) -> bool {
        self.check_punct("{") || matches!(self.peek(), Token::Newline)
    }

    /// A `for`-clause statement without the usual newline terminator: a
    /// bare declaration (`i: 0`) or an expression (typically an
    /// assignment, e.g. `i = i + 1`).
    fn for_clause_stmt(&mut self) -> Result<Spanned<Ast>, ParseError> {
        let start = self.current_span();
        if matches!(self.peek(), Token::Identifier(_)) && matches!(self.peek_at(1), Token::Punctuation(p) if p == ":") {
            let name = self.expect_identifier()?;
            self.expect_punct(":")?;
            let init = Some(Box::new(self.expression()?));
            let span = Span::combine(&start, &self.current_span());
            return Ok(Spanned::new(Ast::VarDecl { name, mutable: Mutability::Mutable, init }, span));
        }
        let expr = self.expression()?;
        Ok(expr)
    }

    fn import_stmt(&mut self) -> Result<Spanned<Ast>, ParseError> {
        let start = self.current_span();
        self.advance(); // import
        let path = match self.peek().clone() {
            Token::String(s) => { self.advance(); s }
            Token::Identifier(s) => { self.advance(); s }
            other => return Err(ParseError::UnexpectedToken { found: other.to_string(), expected: "module path or name".into(), span: self.current_span() }),
        };
        let span = Span::combine(&start, &self.current_span());
        self.end_of_statement()?;
        Ok(Spanned::new(Ast::Import { path }, span))
    }

    /// A block is either brace-delimited or an indented suite; both
    /// surfaces produce the same `Ast::Block` (`spec.md` §9 — "the
    /// compiler should not care which was used").
    fn block(&mut self) -> Result<Spanned<Ast>, ParseError> {
        if self.check_punct("{") {
            return self.braced_block();
        }
        if matches!(self.peek(), Token::Newline) {
            self.advance();
        }
        self.indented_block()
    }

    fn braced_block(&mut self) -> Result<Spanned<Ast>, ParseError> {
        let start = self.current_span();
        self.expect_punct("{")?;
        self.skip_newlines();
        let mut stmts = vec![];
        while !self.check_punct("}") {
            if self.at_eof() {
                return Err(ParseError::UnexpectedEof { span: self.current_span() });
            }
            stmts.push(self.statement()?);
            self.skip_newlines();
        }
        self.expect_punct("}")?;
        let span = Span::combine(&start, &self.current_span());
        Ok(Spanned::new(Ast::Block(stmts), span))
    }

    fn indented_block(&mut self) -> Result<Spanned<Ast>, ParseError> {
        let start = self.current_span();
        if !matches!(self.peek(), Token::Indent) {
            return Err(ParseError::UnexpectedToken { found: self.peek().to_string(), expected: "indented block".into(), span: self.current_span() });
        }
        self.advance(); // indent
        let mut stmts = vec![];
        self.skip_newlines();
        while !matches!(self.peek(), Token::Dedent) {
            if self.at_eof() {
                return Err(ParseError::UnexpectedEof { span: self.current_span() });
            }
            stmts.push(self.statement()?);
            self.skip_newlines();
        }
        self.advance(); // dedent
        let span = Span::combine(&start, &self.current_span());
        Ok(Spanned::new(Ast::Block(stmts), span))
    }

    // --- expressions: precedence ladder -----------------------------------
    // low -> high: assignment, or, and, equality, comparison, additive,
    // multiplicative, unary, range, postfix, primary.

    fn expression(&mut self) -> Result<Spanned<Ast>, ParseError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Spanned<Ast>, ParseError> {
        let target = self.or_expr()?;
        if self.match_op("=") {
            let value = self.assignment()?;
            let span = Span::combine(&target.span, &value.span);
            return Ok(match target.item {
                Ast::Variable(name) => Spanned::new(Ast::assignment(name, value), span),
                Ast::PropertyAccess { object, property } => {
                    Spanned::new(Ast::PropertyAssignment { object, property, value: Box::new(value) }, span)
                }
                _ => return Err(ParseError::MalformedConstruct { what: "assignment target".into(), span }),
            });
        }
        Ok(target)
    }

    fn or_expr(&mut self) -> Result<Spanned<Ast>, ParseError> {
        let mut left = self.and_expr()?;
        while self.check_op("||") {
            self.advance();
            let right = self.and_expr()?;
            let span = Span::combine(&left.span, &right.span);
            left = Spanned::new(Ast::Binary { op: BinaryOp::Or, left: Box::new(left), right: Box::new(right) }, span);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Spanned<Ast>, ParseError> {
        let mut left = self.equality()?;
        while self.check_op("&&") {
            self.advance();
            let right = self.equality()?;
            let span = Span::combine(&left.span, &right.span);
            left = Spanned::new(Ast::Binary { op: BinaryOp::And, left: Box::new(left), right: Box::new(right) }, span);
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Spanned<Ast>, ParseError> {
        let mut left = self.comparison()?;
        loop {
            let op = if self.check_op("==") { BinaryOp::Eq } else if self.check_op("!=") { BinaryOp::Neq } else { break };
            self.advance();
            let right = self.comparison()?;
            let span = Span::combine(&left.span, &right.span);
            left = Spanned::new(Ast::Binary { op, left: Box::new(left), right: Box::new(right) }, span);
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Spanned<Ast>, ParseError> {
        let mut left = self.additive()?;
        loop {
            let op = if self.check_op("<") { BinaryOp::Lt }
                else if self.check_op(">") { BinaryOp::Gt }
                else if self.check_op("<=") { BinaryOp::Lte }
                else if self.check_op(">=") { BinaryOp::Gte }
                else { break };
            self.advance();
            let right = self.additive()?;
            let span = Span::combine(&left.span, &right.span);
            left = Spanned::new(Ast::Binary { op, left: Box::new(left), right: Box::new(right) }, span);
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Spanned<Ast>, ParseError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = if self.check_op("+") { BinaryOp::Add } else if self.check_op("-") { BinaryOp::Sub } else { break };
            self.advance();
            let right = self.multiplicative()?;
            let span = Span::combine(&left.span, &right.span);
            left = Spanned::new(Ast::Binary { op, left: Box::new(left), right: Box::new(right) }, span);
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Spanned<Ast>, ParseError> {
        let mut left = self.unary()?;
        loop {
            let op = if self.check_op("*") { BinaryOp::Mul }
                else if self.check_op("/") { BinaryOp::Div }
                else if self.check_op("%") { BinaryOp::Mod }
                else { break };
            self.advance();
            let right = self.unary()?;
            let span = Span::combine(&left.span, &right.span);
            left = Spanned::new(Ast::Binary { op, left: Box::new(left), right: Box::new(right) }, span);
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Spanned<Ast>, ParseError> {
        let start = self.current_span();
        let op = if self.check_op("!") { Some(UnaryOp::Not) } else if self.check_op("-") { Some(UnaryOp::Neg) } else { None };
        if let Some(op) = op {
            self.advance();
            let operand = self.unary()?;
            let span = Span::combine(&start, &operand.span);
            return Ok(Spanned::new(Ast::Unary { op, operand: Box::new(operand) }, span));
        }
        self.range_expr()
    }

    fn range_expr(&mut self) -> Result<Spanned<Ast>, ParseError> {
        let start = self.postfix()?;
        if self.check_op("..") {
            self.advance();
            let end = self.postfix()?;
            let span = Span::combine(&start.span, &end.span);
            return Ok(Spanned::new(Ast::Range { start: Box::new(start), end: Box::new(end) }, span));
        }
        Ok(start)
    }

    fn postfix(&mut self) -> Result<Spanned<Ast>, ParseError> {
        let mut expr = self.primary()?;
        loop {
            if self.match_punct(".") {
                let name = self.expect_identifier()?;
                if self.check_punct("(") {
                    let args = self.call_args()?;
                    let span = Span::combine(&expr.span, &self.current_span());
                    expr = Spanned::new(Ast::MethodCall { object: Box::new(expr), method: name, args }, span);
                } else {
                    let span = Span::combine(&expr.span, &self.current_span());
                    expr = Spanned::new(Ast::PropertyAccess { object: Box::new(expr), property: name }, span);
                }
            } else if self.match_punct("[") {
                let index = self.expression()?;
                self.expect_punct("]")?;
                let span = Span::combine(&expr.span, &self.current_span());
                expr = Spanned::new(Ast::IndexAccess { array: Box::new(expr), index: Box::new(index) }, span);
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn call_args(&mut self) -> Result<Vec<Spanned<Ast>>, ParseError> {
        self.expect_punct("(")?;
        let mut args = vec![];
        if !self.check_punct(")") {
            loop {
                args.push(self.expression()?);
                if !self.match_punct(",") { break; }
            }
        }
        self.expect_punct(")")?;
        Ok(args)
    }

    fn primary(&mut self) -> Result<Spanned<Ast>, ParseError> {
        let start = self.current_span();
        match self.peek().clone() {
            Token::Number(n) => { self.advance(); Ok(Spanned::new(Ast::Literal(Literal::Number(n)), start)) }
            Token::String(s) => { self.advance(); Ok(Spanned::new(Ast::Literal(Literal::String(s)), start)) }
            Token::Boolean(b) => { self.advance(); Ok(Spanned::new(Ast::Literal(Literal::Boolean(b)), start)) }
            Token::Null => { self.advance(); Ok(Spanned::new(Ast::Literal(Literal::Null), start)) }
            Token::Identifier(name) => {
                self.advance();
                if self.check_punct("(") {
                    let args = self.call_args()?;
                    let span = Span::combine(&start, &self.current_span());
                    Ok(Spanned::new(Ast::FunctionCall { name, args }, span))
                } else {
                    Ok(Spanned::new(Ast::Variable(name), start))
                }
            }
            Token::Punctuation(p) if p == "(" => {
                self.advance();
                let inner = self.expression()?;
                self.expect_punct(")")?;
                Ok(inner)
            }
            Token::Punctuation(p) if p == "[" => self.array_literal(start),
            Token::Punctuation(p) if p == "{" => self.object_literal(start),
            Token::Keyword(k) if k == "fn" => self.lambda_expr(start),
            other => Err(ParseError::UnexpectedToken { found: other.to_string(), expected: "expression".into(), span: start }),
        }
    }

    /// Anonymous function value, used as an object-literal method
    /// (`hi: fn() { ... }`). Unlike the named statement form, no event
    /// binding head (`<- [ ... ]`) is accepted here.
    fn lambda_expr(&mut self, start: Span) -> Result<Spanned<Ast>, ParseError> {
        self.advance(); // fn
        self.expect_punct("(")?;
        let mut params = vec![];
        if !self.check_punct(")") {
            loop {
                params.push(self.expect_identifier()?);
                if !self.match_punct(",") { break; }
            }
        }
        self.expect_punct(")")?;
        let body = self.block()?;
        let span = Span::combine(&start, &body.span);
        Ok(Spanned::new(Ast::Lambda { params, body: Box::new(body) }, span))
    }

    fn array_literal(&mut self, start: Span) -> Result<Spanned<Ast>, ParseError> {
        self.expect_punct("[")?;
        let mut elements = vec![];
        self.skip_newlines();
        if !self.check_punct("]") {
            loop {
                self.skip_newlines();
                elements.push(self.expression()?);
                self.skip_newlines();
                if !self.match_punct(",") { break; }
                self.skip_newlines();
            }
        }
        self.skip_newlines();
        self.expect_punct("]")?;
        let span = Span::combine(&start, &self.current_span());
        Ok(Spanned::new(Ast::ArrayLiteral(elements), span))
    }

    fn object_literal(&mut self, start: Span) -> Result<Spanned<Ast>, ParseError> {
        self.expect_punct("{")?;
        self.skip_newlines();

        let mut mixins = vec![];
        if self.check_punct(":") {
            self.advance();
            self.expect_punct("[")?;
            if !self.check_punct("]") {
                loop {
                    mixins.push(self.expect_identifier()?);
                    if !self.match_punct(",") { break; }
                }
            }
            self.expect_punct("]")?;
            self.match_punct(",");
            self.skip_newlines();
        }

        let mut properties = vec![];
        while !self.check_punct("}") {
            let key = self.expect_identifier()?;
            self.expect_punct(":")?;
            let value = self.expression()?;
            properties.push((key, value));
            self.skip_newlines();
            if !self.match_punct(",") { self.skip_newlines(); break; }
            self.skip_newlines();
        }
        self.expect_punct("}")?;
        let span = Span::combine(&start, &self.current_span());
        Ok(Spanned::new(Ast::ObjectLiteral { mixins, properties }, span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::source::Source;

    fn parse_src(src: &str) -> Vec<Spanned<Ast>> {
        let tokens = Lexer::lex(Source::source(src)).unwrap();
        Parser::parse(tokens).unwrap()
    }

    #[test]
    fn parses_arithmetic_declaration() {
        let stmts = parse_src("var a: 2\nvar b: 3\nprint(a + b)\n");
        assert_eq!(stmts.len(), 3);
        assert!(matches!(stmts[0].item, Ast::VarDecl { .. }));
        assert!(matches!(stmts[2].item, Ast::Print(_)));
    }

    #[test]
    fn parses_object_literal_with_mixin() {
        let stmts = parse_src("p: { :[Greet], name: \"A\" }\n");
        match &stmts[0].item {
            Ast::VarDecl { init: Some(expr), .. } => match &expr.item {
                Ast::ObjectLiteral { mixins, properties } => {
                    assert_eq!(mixins, &vec!["Greet".to_string()]);
                    assert_eq!(properties.len(), 1);
                }
                other => panic!("expected object literal, got {:?}", other),
            },
            other => panic!("expected var decl, got {:?}", other),
        }
    }

    #[test]
    fn parses_naked_iterator() {
        let stmts = parse_src("sum: 0\ni: 1..4\n  sum = sum + i\nprint(sum)\n");
        assert!(matches!(stmts[1].item, Ast::NakedIterator { .. }));
    }

    #[test]
    fn parses_nested_property_assignment() {
        let stmts = parse_src("g.p.q = \"x\"\n");
        assert!(matches!(stmts[0].item, Ast::PropertyAssignment { .. }));
    }

    #[test]
    fn parses_braced_function_def() {
        let stmts = parse_src("add: fn(a, b) { a + b }\n");
        assert!(matches!(stmts[0].item, Ast::FunctionDef { .. }));
    }
}
