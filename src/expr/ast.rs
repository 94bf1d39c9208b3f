use crate::error::{CalcError, CalcResult};
use std::convert::Infallible;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
        }
    }

    /// Operator for `symbol`, for callers that build trees programmatically.
    pub fn from_symbol(symbol: char) -> CalcResult<Self> {
        match symbol {
            '+' => Ok(Operator::Add),
            '-' => Ok(Operator::Sub),
            '*' => Ok(Operator::Mul),
            '/' => Ok(Operator::Div),
            other => Err(CalcError::UnsupportedOperation {
                operator: other.to_string(),
            }),
        }
    }
}

impl TryFrom<char> for Operator {
    type Error = CalcError;

    fn try_from(symbol: char) -> Result<Self, Self::Error> {
        Operator::from_symbol(symbol)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Expression tree. Each node exclusively owns its children.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionNode {
    Literal(f64),
    BinaryOp {
        operator: Operator,
        left: Box<ExpressionNode>,
        right: Box<ExpressionNode>,
    },
}

impl ExpressionNode {
    pub fn literal(value: f64) -> Self {
        ExpressionNode::Literal(value)
    }

    pub fn binary(operator: Operator, left: ExpressionNode, right: ExpressionNode) -> Self {
        ExpressionNode::BinaryOp {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Levels of the modulus chain an evaluation of this tree needs.
    ///
    /// A division's divisor is decrypted, so it only needs to be evaluable;
    /// the level spent is on the dividend's side.
    pub fn multiplicative_depth(&self) -> usize {
        self.fold(
            |_| 0,
            |operator, l, r| match operator {
                Operator::Add | Operator::Sub => l.max(r),
                Operator::Mul => l.max(r) + 1,
                Operator::Div => (l + 1).max(r),
            },
        )
    }

    pub fn node_count(&self) -> usize {
        self.fold(|_| 1, |_, l, r| 1 + l + r)
    }

    /// Plaintext value of the tree, for reference checks.
    pub fn evaluate_plain(&self) -> f64 {
        self.fold(
            |v| v,
            |operator, l, r| match operator {
                Operator::Add => l + r,
                Operator::Sub => l - r,
                Operator::Mul => l * r,
                Operator::Div => l / r,
            },
        )
    }

    /// Bottom-up reduction, left operand before right, on an explicit stack
    /// so arbitrarily deep trees cannot overflow the call stack.
    pub fn try_fold<T, E>(
        &self,
        mut leaf: impl FnMut(f64) -> Result<T, E>,
        mut branch: impl FnMut(Operator, T, T) -> Result<T, E>,
    ) -> Result<T, E> {
        enum Step<'a> {
            Visit(&'a ExpressionNode),
            Combine(Operator),
        }

        let mut steps = vec![Step::Visit(self)];
        let mut values: Vec<T> = Vec::new();
        while let Some(step) = steps.pop() {
            match step {
                Step::Visit(ExpressionNode::Literal(value)) => values.push(leaf(*value)?),
                Step::Visit(ExpressionNode::BinaryOp {
                    operator,
                    left,
                    right,
                }) => {
                    steps.push(Step::Combine(*operator));
                    steps.push(Step::Visit(right));
                    steps.push(Step::Visit(left));
                }
                Step::Combine(operator) => {
                    let (Some(r), Some(l)) = (values.pop(), values.pop()) else {
                        unreachable!("every operator follows its two operands");
                    };
                    values.push(branch(operator, l, r)?);
                }
            }
        }
        let Some(result) = values.pop() else {
            unreachable!("a tree reduces to exactly one value");
        };
        Ok(result)
    }

    pub fn fold<T>(
        &self,
        mut leaf: impl FnMut(f64) -> T,
        mut branch: impl FnMut(Operator, T, T) -> T,
    ) -> T {
        let folded: Result<T, Infallible> =
            self.try_fold(|v| Ok(leaf(v)), |op, l, r| Ok(branch(op, l, r)));
        match folded {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }
}

/// Unlinks children onto a heap stack so dropping a deep tree does not recurse.
impl Drop for ExpressionNode {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        detach_children(self, &mut pending);
        while let Some(mut node) = pending.pop() {
            detach_children(&mut node, &mut pending);
        }
    }
}

fn detach_children(node: &mut ExpressionNode, pending: &mut Vec<ExpressionNode>) {
    if let ExpressionNode::BinaryOp { left, right, .. } = node {
        pending.push(std::mem::replace(&mut **left, ExpressionNode::Literal(0.0)));
        pending.push(std::mem::replace(&mut **right, ExpressionNode::Literal(0.0)));
    }
}

impl fmt::Display for ExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionNode::Literal(v) => write!(f, "{v}"),
            ExpressionNode::BinaryOp {
                operator,
                left,
                right,
            } => write!(f, "({left} {operator} {right})"),
        }
    }
}
