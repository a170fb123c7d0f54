// Function Modifier Registry
//
// Per-dialect table of rewrite rules keyed by canonical (lower case)
// function name. A modifier either declines (`None`, default rendering) or
// returns the token sequence to emit in place of the call.
//
// Functions a modifier synthesizes are built with `Function::native`, so
// the renderer never feeds a modifier's output back into the registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{DataType, Expression, Function, Literal};

/// Piece of rendered output produced by a modifier
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Emitted verbatim
    Text(String),
    /// Rendered recursively
    Expr(Expression),
}

impl Token {
    pub fn text(text: impl Into<String>) -> Self {
        Token::Text(text.into())
    }
}

/// Rewrite rule for one canonical function
pub trait FunctionModifier: Send + Sync {
    fn modify(&self, function: &Function) -> Result<Option<Vec<Token>>>;
}

impl<F> FunctionModifier for F
where
    F: Fn(&Function) -> Result<Option<Vec<Token>>> + Send + Sync,
{
    fn modify(&self, function: &Function) -> Result<Option<Vec<Token>>> {
        self(function)
    }
}

/// Renames the function, keeping its arguments
pub struct AliasModifier {
    name: String,
}

impl AliasModifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl FunctionModifier for AliasModifier {
    fn modify(&self, function: &Function) -> Result<Option<Vec<Token>>> {
        Ok(Some(vec![Token::Expr(Expression::Function(Function::native(
            self.name.clone(),
            function.args.clone(),
            function.data_type,
        )))]))
    }
}

/// Maps `convert(x, type)` / `cast(x, type)` to `CAST(x AS <native type>)`
/// using the dialect's type names, keyed by the call's result type.
pub struct ConvertModifier {
    types: HashMap<DataType, &'static str>,
}

impl ConvertModifier {
    pub fn new(types: &[(DataType, &'static str)]) -> Self {
        Self {
            types: types.iter().copied().collect(),
        }
    }
}

impl FunctionModifier for ConvertModifier {
    fn modify(&self, function: &Function) -> Result<Option<Vec<Token>>> {
        let (Some(native_type), Some(arg)) =
            (self.types.get(&function.data_type), function.args.first())
        else {
            return Ok(None);
        };

        Ok(Some(vec![
            Token::text("CAST("),
            Token::Expr(arg.clone()),
            Token::text(format!(" AS {})", native_type)),
        ]))
    }
}

/// Registry of function modifiers for one dialect
///
/// Built once when the dialect is initialised and shared read-only
/// afterwards.
#[derive(Clone, Default)]
pub struct FunctionModifierRegistry {
    modifiers: HashMap<String, Arc<dyn FunctionModifier>>,
}

impl fmt::Debug for FunctionModifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.modifiers.keys().collect();
        names.sort();
        f.debug_struct("FunctionModifierRegistry")
            .field("functions", &names)
            .finish()
    }
}

impl FunctionModifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a modifier under a canonical function name
    pub fn register<M>(mut self, name: &str, modifier: M) -> Self
    where
        M: FunctionModifier + 'static,
    {
        self.modifiers
            .insert(name.to_lowercase(), Arc::new(modifier));
        self
    }

    /// Add a simple rename rule
    pub fn alias(self, name: &str, native_name: &str) -> Self {
        self.register(name, AliasModifier::new(native_name))
    }

    /// Add a custom rule
    pub fn transform<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&Function) -> Result<Option<Vec<Token>>> + Send + Sync + 'static,
    {
        self.register(name, f)
    }

    pub fn lookup(&self, name: &str) -> Option<&dyn FunctionModifier> {
        self.modifiers
            .get(name.to_lowercase().as_str())
            .map(|modifier| modifier.as_ref())
    }

    pub fn has_rule(&self, name: &str) -> bool {
        self.modifiers.contains_key(name.to_lowercase().as_str())
    }

    /// Apply the registered modifier for `function`, if any.
    ///
    /// Native functions are never modified.
    pub fn modify(&self, function: &Function) -> Result<Option<Vec<Token>>> {
        if function.native {
            return Ok(None);
        }
        match self.lookup(&function.name) {
            Some(modifier) => modifier.modify(function),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }
}

/// Native call node, shorthand for modifier implementations
pub fn native_call(name: &str, args: Vec<Expression>, data_type: DataType) -> Expression {
    Expression::Function(Function::native(name, args, data_type))
}

/// Single native call as a token sequence
pub fn native_tokens(name: &str, args: Vec<Expression>, data_type: DataType) -> Vec<Token> {
    vec![Token::Expr(native_call(name, args, data_type))]
}

fn integer(value: i64) -> Expression {
    Expression::literal(Literal::integer(value))
}

/// `left(x, n)` as `<substr>(x, 1, n)`
pub fn left_as_substr(substr: &'static str) -> impl FunctionModifier {
    move |function: &Function| -> Result<Option<Vec<Token>>> {
        let [value, length] = function.args.as_slice() else {
            return Ok(None);
        };
        Ok(Some(native_tokens(
            substr,
            vec![value.clone(), integer(1), length.clone()],
            function.data_type,
        )))
    }
}

/// `right(x, n)` as `<substr>(x, (<length>(x) - n) + 1)`
pub fn right_as_substr(substr: &'static str, length: &'static str) -> impl FunctionModifier {
    move |function: &Function| -> Result<Option<Vec<Token>>> {
        let [value, count] = function.args.as_slice() else {
            return Ok(None);
        };
        let value_length = native_call(length, vec![value.clone()], DataType::Integer);
        let start = native_call(
            "+",
            vec![
                native_call("-", vec![value_length, count.clone()], DataType::Integer),
                integer(1),
            ],
            DataType::Integer,
        );
        Ok(Some(native_tokens(
            substr,
            vec![value.clone(), start],
            function.data_type,
        )))
    }
}

/// `locate(search, value[, start])` as `<instr>(value, search[, start])`
pub fn locate_as_instr(instr: &'static str) -> impl FunctionModifier {
    move |function: &Function| -> Result<Option<Vec<Token>>> {
        let mut args = function.args.clone();
        if args.len() < 2 || args.len() > 3 {
            return Ok(None);
        }
        args.swap(0, 1);
        Ok(Some(native_tokens(instr, args, function.data_type)))
    }
}

/// `concat(a, b, ...)` as `(a || b || ...)`
pub fn concat_as_operator() -> impl FunctionModifier {
    |function: &Function| -> Result<Option<Vec<Token>>> {
        if function.args.len() < 2 {
            return Ok(None);
        }
        let mut tokens = vec![Token::text("(")];
        for (idx, arg) in function.args.iter().enumerate() {
            if idx > 0 {
                tokens.push(Token::text(" || "));
            }
            tokens.push(Token::Expr(arg.clone()));
        }
        tokens.push(Token::text(")"));
        Ok(Some(tokens))
    }
}

/// `fn(x)` as `EXTRACT(<field> FROM x)`
pub fn extract(field: &'static str) -> impl FunctionModifier {
    move |function: &Function| -> Result<Option<Vec<Token>>> {
        let [value] = function.args.as_slice() else {
            return Ok(None);
        };
        Ok(Some(vec![
            Token::text(format!("EXTRACT({} FROM ", field)),
            Token::Expr(value.clone()),
            Token::text(")"),
        ]))
    }
}
