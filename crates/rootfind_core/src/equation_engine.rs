use crate::autodiff::Dual;
use crate::error::RootFindingError;
use crate::traits::Scalar;
use std::collections::HashMap;
use thiserror::Error;

/// The single independent variable every equation is written in.
pub const VARIABLE: &str = "x";

/// Reasons an equation string can fail to compile.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("equation is empty")]
    Empty,
    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },
    #[error("invalid number literal \"{0}\"")]
    InvalidNumber(String),
    #[error("unknown variable or constant: {0}")]
    UnknownSymbol(String),
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("expected ')'")]
    MissingParen,
    #[error("unexpected {0}")]
    UnexpectedToken(String),
    #[error("unexpected end of equation")]
    UnexpectedEnd,
}

/// Built-in single-argument functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    Ln,
    Log10,
    Log2,
    Sqrt,
    Cbrt,
    Abs,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        let function = match name {
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "tan" => Self::Tan,
            "asin" => Self::Asin,
            "acos" => Self::Acos,
            "atan" => Self::Atan,
            "sinh" => Self::Sinh,
            "cosh" => Self::Cosh,
            "tanh" => Self::Tanh,
            "exp" => Self::Exp,
            // `log` is the natural logarithm, as in most math namespaces.
            "log" | "ln" => Self::Ln,
            "log10" => Self::Log10,
            "log2" => Self::Log2,
            "sqrt" => Self::Sqrt,
            "cbrt" => Self::Cbrt,
            "abs" => Self::Abs,
            _ => return None,
        };
        Some(function)
    }

    fn apply<T: Scalar>(self, a: T) -> T {
        match self {
            Self::Sin => a.sin(),
            Self::Cos => a.cos(),
            Self::Tan => a.tan(),
            Self::Asin => a.asin(),
            Self::Acos => a.acos(),
            Self::Atan => a.atan(),
            Self::Sinh => a.sinh(),
            Self::Cosh => a.cosh(),
            Self::Tanh => a.tanh(),
            Self::Exp => a.exp(),
            Self::Ln => a.ln(),
            Self::Log10 => a.log10(),
            Self::Log2 => a.log2(),
            Self::Sqrt => a.sqrt(),
            Self::Cbrt => a.cbrt(),
            Self::Abs => a.abs(),
        }
    }
}

/// OpCodes for the Stack-based Virtual Machine.
/// The VM operates on a stack of `Scalar` values (f64 or Dual).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpCode {
    /// Pushes a constant `f64` value onto the stack.
    LoadConst(f64),
    /// Pushes the value of the independent variable onto the stack.
    LoadVar,
    /// Pops top two values (b, a), pushes (a + b).
    Add,
    /// Pops top two values (b, a), pushes (a - b).
    Sub,
    /// Pops top two values (b, a), pushes (a * b).
    Mul,
    /// Pops top two values (b, a), pushes (a / b).
    Div,
    /// Pops top two values (b, a), pushes (a ^ b).
    Pow,
    /// Pops top value (a), pushes a^n for a literal integer exponent.
    PowI(i32),
    /// Pops top value (a), pushes -a.
    Neg,
    /// Pops top value (a), pushes f(a).
    Call(Function),
}

/// Represents a compiled sequence of operations.
#[derive(Debug, Clone, Default)]
pub struct Bytecode {
    pub ops: Vec<OpCode>,
    /// Deepest stack the ops reach, used to size the evaluation buffer.
    pub max_depth: usize,
}

/// Stack-based Virtual Machine for evaluating equations.
///
/// The VM is stateless; `execute` takes all necessary context:
/// - `bytecode`: Instructions to run.
/// - `x`: Value of the independent variable.
/// - `stack`: A mutable buffer for intermediate computations.
///
/// Returns `None` only for malformed bytecode (stack underflow or leftovers),
/// which the compiler never produces.
pub struct VM;

impl VM {
    pub fn execute<T: Scalar>(bytecode: &Bytecode, x: T, stack: &mut Vec<T>) -> Option<T> {
        stack.clear();

        for op in &bytecode.ops {
            match *op {
                OpCode::LoadConst(val) => stack.push(T::from_f64(val)?),
                OpCode::LoadVar => stack.push(x),
                OpCode::Add => {
                    let b = stack.pop()?;
                    let a = stack.pop()?;
                    stack.push(a + b);
                }
                OpCode::Sub => {
                    let b = stack.pop()?;
                    let a = stack.pop()?;
                    stack.push(a - b);
                }
                OpCode::Mul => {
                    let b = stack.pop()?;
                    let a = stack.pop()?;
                    stack.push(a * b);
                }
                OpCode::Div => {
                    let b = stack.pop()?;
                    let a = stack.pop()?;
                    stack.push(a / b);
                }
                OpCode::Pow => {
                    let b = stack.pop()?;
                    let a = stack.pop()?;
                    stack.push(a.powf(b));
                }
                OpCode::PowI(n) => {
                    let a = stack.pop()?;
                    stack.push(a.powi(n));
                }
                OpCode::Neg => {
                    let a = stack.pop()?;
                    stack.push(-a);
                }
                OpCode::Call(function) => {
                    let a = stack.pop()?;
                    stack.push(function.apply(a));
                }
            }
        }

        let result = stack.pop()?;
        stack.is_empty().then_some(result)
    }
}

// --- AST & Parser ---

/// Abstract Syntax Tree nodes for expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Binary(Box<Expr>, char, Box<Expr>), // char is operator +, -, *, /, ^
    Unary(char, Box<Expr>),             // -
    Call(String, Box<Expr>),            // functions like sin(x)
}

/// Compiles an AST (`Expr`) into `Bytecode`.
/// Resolves the variable and named constants.
pub struct Compiler {
    pub variable: String,
    pub constants: HashMap<&'static str, f64>,
}

impl Compiler {
    pub fn new(variable: &str) -> Self {
        let constants = HashMap::from([("pi", std::f64::consts::PI), ("e", std::f64::consts::E)]);
        Self {
            variable: variable.to_string(),
            constants,
        }
    }

    pub fn compile(&self, expr: &Expr) -> Result<Bytecode, CompileError> {
        let mut bytecode = Bytecode::default();
        let mut depth = 0;
        self.compile_recursive(expr, &mut bytecode, &mut depth)?;
        Ok(bytecode)
    }

    fn push(bytecode: &mut Bytecode, depth: &mut usize, op: OpCode) {
        match op {
            OpCode::LoadConst(_) | OpCode::LoadVar => *depth += 1,
            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Pow => *depth -= 1,
            OpCode::PowI(_) | OpCode::Neg | OpCode::Call(_) => {}
        }
        bytecode.max_depth = bytecode.max_depth.max(*depth);
        bytecode.ops.push(op);
    }

    fn compile_recursive(
        &self,
        expr: &Expr,
        bytecode: &mut Bytecode,
        depth: &mut usize,
    ) -> Result<(), CompileError> {
        match expr {
            Expr::Number(n) => Self::push(bytecode, depth, OpCode::LoadConst(*n)),
            Expr::Variable(name) => {
                if *name == self.variable {
                    Self::push(bytecode, depth, OpCode::LoadVar);
                } else if let Some(&value) = self.constants.get(name.as_str()) {
                    Self::push(bytecode, depth, OpCode::LoadConst(value));
                } else {
                    return Err(CompileError::UnknownSymbol(name.clone()));
                }
            }
            Expr::Binary(left, '^', right) => {
                self.compile_recursive(left, bytecode, depth)?;
                match integer_exponent(right) {
                    Some(n) => Self::push(bytecode, depth, OpCode::PowI(n)),
                    None => {
                        self.compile_recursive(right, bytecode, depth)?;
                        Self::push(bytecode, depth, OpCode::Pow);
                    }
                }
            }
            Expr::Binary(left, op, right) => {
                self.compile_recursive(left, bytecode, depth)?;
                self.compile_recursive(right, bytecode, depth)?;
                let code = match op {
                    '+' => OpCode::Add,
                    '-' => OpCode::Sub,
                    '*' => OpCode::Mul,
                    '/' => OpCode::Div,
                    other => return Err(CompileError::UnexpectedToken(format!("operator '{other}'"))),
                };
                Self::push(bytecode, depth, code);
            }
            Expr::Unary(op, operand) => {
                self.compile_recursive(operand, bytecode, depth)?;
                match op {
                    '-' => Self::push(bytecode, depth, OpCode::Neg),
                    '+' => {}
                    other => return Err(CompileError::UnexpectedToken(format!("operator '{other}'"))),
                }
            }
            Expr::Call(name, arg) => {
                let function = Function::from_name(name)
                    .ok_or_else(|| CompileError::UnknownFunction(name.clone()))?;
                self.compile_recursive(arg, bytecode, depth)?;
                Self::push(bytecode, depth, OpCode::Call(function));
            }
        }
        Ok(())
    }
}

fn integer_exponent(expr: &Expr) -> Option<i32> {
    let value = match expr {
        Expr::Number(n) => *n,
        Expr::Unary('-', inner) => match inner.as_ref() {
            Expr::Number(n) => -*n,
            _ => return None,
        },
        _ => return None,
    };
    (value.fract() == 0.0 && value.abs() <= i32::MAX as f64).then(|| value as i32)
}

// --- Simple Parser ---

/// Parses a string expression into an AST.
pub fn parse(input: &str) -> Result<Expr, CompileError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(CompileError::Empty);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expression()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(CompileError::UnexpectedToken(token.describe())),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {n}"),
            Token::Identifier(name) => format!("identifier '{name}'"),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::Caret => "'^'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, CompileError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(position, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() || c == '.' {
            let mut literal = String::new();
            while let Some(&(_, d)) = chars.peek() {
                let exponent_sign =
                    (d == '+' || d == '-') && literal.ends_with(|ch: char| ch == 'e' || ch == 'E');
                if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' || exponent_sign {
                    literal.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            let value = literal
                .parse()
                .map_err(|_| CompileError::InvalidNumber(literal.clone()))?;
            tokens.push(Token::Number(value));
        } else if c.is_alphabetic() || c == '_' {
            let mut ident = String::new();
            while let Some(&(_, d)) = chars.peek() {
                if d.is_alphanumeric() || d == '_' {
                    ident.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Identifier(ident));
        } else {
            chars.next();
            let token = match c {
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' => {
                    // `**` is accepted as an alias for `^`.
                    if let Some(&(_, '*')) = chars.peek() {
                        chars.next();
                        Token::Caret
                    } else {
                        Token::Star
                    }
                }
                '/' => Token::Slash,
                '^' => Token::Caret,
                '(' => Token::LParen,
                ')' => Token::RParen,
                ch => return Err(CompileError::UnexpectedChar { ch, position }),
            };
            tokens.push(token);
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_expression(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_term()?;

        while let Some(token) = self.peek() {
            let op = match token {
                Token::Plus => '+',
                Token::Minus => '-',
                _ => break,
            };
            self.consume();
            let right = self.parse_term()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_unary()?;

        while let Some(token) = self.peek() {
            let op = match token {
                Token::Star => '*',
                Token::Slash => '/',
                _ => break,
            };
            self.consume();
            let right = self.parse_unary()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.consume();
                let expr = self.parse_unary()?;
                Ok(Expr::Unary('-', Box::new(expr)))
            }
            Some(Token::Plus) => {
                self.consume();
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    /// Power binds tighter than unary minus and is right-associative,
    /// so `-x^2` is `-(x^2)` and `2^3^2` is `2^(3^2)`.
    fn parse_power(&mut self) -> Result<Expr, CompileError> {
        let base = self.parse_primary()?;
        if let Some(Token::Caret) = self.peek() {
            self.consume();
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(Box::new(base), '^', Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        match self.consume() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Identifier(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    self.consume(); // eat '('
                    let arg = self.parse_expression()?;
                    match self.consume() {
                        Some(Token::RParen) => Ok(Expr::Call(name, Box::new(arg))),
                        _ => Err(CompileError::MissingParen),
                    }
                } else {
                    Ok(Expr::Variable(name))
                }
            }
            Some(Token::LParen) => {
                let expr = self.parse_expression()?;
                match self.consume() {
                    Some(Token::RParen) => Ok(expr),
                    _ => Err(CompileError::MissingParen),
                }
            }
            Some(token) => Err(CompileError::UnexpectedToken(token.describe())),
            None => Err(CompileError::UnexpectedEnd),
        }
    }
}

// --- Equation ---

/// A compiled single-variable equation.
///
/// Immutable once compiled; evaluation allocates its own stack so an
/// `Equation` can be shared across threads.
#[derive(Debug, Clone)]
pub struct Equation {
    text: String,
    name: &'static str,
    bytecode: Bytecode,
}

impl Equation {
    /// Compiles `text` as a function of `x`.
    pub fn compile(text: &str) -> Result<Self, RootFindingError> {
        let compile_error = |source| RootFindingError::Compile {
            equation: text.to_string(),
            source,
        };
        let expr = parse(text).map_err(compile_error)?;
        let bytecode = Compiler::new(VARIABLE)
            .compile(&expr)
            .map_err(compile_error)?;
        Ok(Self {
            text: text.to_string(),
            name: "f",
            bytecode,
        })
    }

    /// Renames the function used in evaluation error messages (e.g. `g`).
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs the bytecode on any scalar type. Malformed bytecode yields NaN.
    pub fn eval_scalar<T: Scalar>(&self, x: T) -> T {
        let mut stack = Vec::with_capacity(self.bytecode.max_depth);
        VM::execute(&self.bytecode, x, &mut stack).unwrap_or_else(T::nan)
    }

    /// Evaluates the equation at `x`, failing on a non-finite result.
    pub fn evaluate(&self, x: f64) -> Result<f64, RootFindingError> {
        let value = self.eval_scalar(x);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(RootFindingError::Evaluation {
                function: self.name.to_string(),
                x,
                value,
            })
        }
    }

    /// Evaluates the derivative at `x` by forward-mode differentiation.
    pub fn derivative(&self, x: f64) -> Result<f64, RootFindingError> {
        let value = self.eval_scalar(Dual::variable(x)).eps;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(RootFindingError::Evaluation {
                function: format!("{}'", self.name),
                x,
                value,
            })
        }
    }
}
