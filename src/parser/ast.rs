use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub struct Meta {
    pub start_index: usize,
    pub end_index: usize,
}

impl Meta {
    /// Slice of the program text covered by this node.
    pub fn source_text<'a>(&self, script: &'a str) -> &'a str {
        script.get(self.start_index..self.end_index).unwrap_or("")
    }
}

pub trait HasMeta {
    fn get_meta(&self) -> &Meta;
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierData {
    pub name: String,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgramData {
    pub meta: Meta,
    pub body: Vec<StatementType>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementType {
    ExpressionStatement {
        meta: Meta,
        expression: Box<ExpressionType>,
    },
    BlockStatement {
        meta: Meta,
        body: Vec<StatementType>,
    },
    EmptyStatement {
        meta: Meta,
    },
    ReturnStatement {
        meta: Meta,
        argument: Option<Box<ExpressionType>>,
    },
    IfStatement {
        meta: Meta,
        test: Box<ExpressionType>,
        consequent: Box<StatementType>,
        alternate: Option<Box<StatementType>>,
    },
    DeclarationStatement(DeclarationType),
}

impl HasMeta for StatementType {
    fn get_meta(&self) -> &Meta {
        match self {
            StatementType::ExpressionStatement { meta, .. }
            | StatementType::BlockStatement { meta, .. }
            | StatementType::EmptyStatement { meta }
            | StatementType::ReturnStatement { meta, .. }
            | StatementType::IfStatement { meta, .. } => meta,
            StatementType::DeclarationStatement(d) => d.get_meta(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclarationType {
    FunctionDeclaration(Rc<FunctionData>),
    VariableDeclaration(VariableDeclarationData),
}

impl HasMeta for DeclarationType {
    fn get_meta(&self) -> &Meta {
        match self {
            DeclarationType::FunctionDeclaration(f) => &f.meta,
            DeclarationType::VariableDeclaration(v) => &v.meta,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VariableDeclarationKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarationData {
    pub meta: Meta,
    pub kind: VariableDeclarationKind,
    pub declarations: Vec<VariableDeclaratorData>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaratorData {
    pub meta: Meta,
    pub id: IdentifierData,
    pub init: Option<Box<ExpressionType>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionData {
    pub meta: Meta,
    pub id: Option<IdentifierData>,
    pub params: Vec<IdentifierData>,
    pub body: Vec<StatementType>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralData {
    StringLiteral(String),
    /// String literal whose escapes leave a surrogate unpaired.
    UnpairedStringLiteral,
    BooleanLiteral(bool),
    NullLiteral,
    NumberLiteral(f64),
    RegExpLiteral { pattern: String, flags: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKeyType {
    Named(String),
    Computed(Box<ExpressionType>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyData {
    pub meta: Meta,
    pub key: PropertyKeyType,
    pub value: Box<ExpressionType>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberExpressionType {
    SimpleMemberExpression {
        meta: Meta,
        object: Box<ExpressionType>,
        property: IdentifierData,
    },
    ComputedMemberExpression {
        meta: Meta,
        object: Box<ExpressionType>,
        property: Box<ExpressionType>,
    },
}

impl HasMeta for MemberExpressionType {
    fn get_meta(&self) -> &Meta {
        match self {
            MemberExpressionType::SimpleMemberExpression { meta, .. }
            | MemberExpressionType::ComputedMemberExpression { meta, .. } => meta,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionType {
    Literal {
        meta: Meta,
        value: LiteralData,
    },
    Identifier(IdentifierData),
    ThisExpression {
        meta: Meta,
    },
    ArrayExpression {
        meta: Meta,
        elements: Vec<Option<ExpressionType>>,
    },
    ObjectExpression {
        meta: Meta,
        properties: Vec<PropertyData>,
    },
    FunctionExpression(Rc<FunctionData>),
    UnaryExpression {
        meta: Meta,
        operator: UnaryOperator,
        argument: Box<ExpressionType>,
    },
    UpdateExpression {
        meta: Meta,
        operator: UpdateOperator,
        argument: Box<ExpressionType>,
        prefix: bool,
    },
    BinaryExpression {
        meta: Meta,
        operator: BinaryOperator,
        left: Box<ExpressionType>,
        right: Box<ExpressionType>,
    },
    LogicalExpression {
        meta: Meta,
        operator: LogicalOperator,
        left: Box<ExpressionType>,
        right: Box<ExpressionType>,
    },
    AssignmentExpression {
        meta: Meta,
        operator: AssignmentOperator,
        left: Box<ExpressionType>,
        right: Box<ExpressionType>,
    },
    ConditionalExpression {
        meta: Meta,
        test: Box<ExpressionType>,
        consequent: Box<ExpressionType>,
        alternate: Box<ExpressionType>,
    },
    CallExpression {
        meta: Meta,
        callee: Box<ExpressionType>,
        arguments: Vec<ExpressionType>,
    },
    NewExpression {
        meta: Meta,
        callee: Box<ExpressionType>,
        arguments: Vec<ExpressionType>,
    },
    MemberExpression(MemberExpressionType),
    SequenceExpression {
        meta: Meta,
        expressions: Vec<ExpressionType>,
    },
}

impl HasMeta for ExpressionType {
    fn get_meta(&self) -> &Meta {
        match self {
            ExpressionType::Literal { meta, .. }
            | ExpressionType::ThisExpression { meta }
            | ExpressionType::ArrayExpression { meta, .. }
            | ExpressionType::ObjectExpression { meta, .. }
            | ExpressionType::UnaryExpression { meta, .. }
            | ExpressionType::UpdateExpression { meta, .. }
            | ExpressionType::BinaryExpression { meta, .. }
            | ExpressionType::LogicalExpression { meta, .. }
            | ExpressionType::AssignmentExpression { meta, .. }
            | ExpressionType::ConditionalExpression { meta, .. }
            | ExpressionType::CallExpression { meta, .. }
            | ExpressionType::NewExpression { meta, .. }
            | ExpressionType::SequenceExpression { meta, .. } => meta,
            ExpressionType::Identifier(id) => &id.meta,
            ExpressionType::FunctionExpression(f) => &f.meta,
            ExpressionType::MemberExpression(m) => m.get_meta(),
        }
    }
}

/// Raised when an operator token has no matching variant.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownOperator(pub String);

impl fmt::Display for UnknownOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown operator `{}`", self.0)
    }
}

impl std::error::Error for UnknownOperator {}

macro_rules! operator_enum {
    ($(#[$doc:meta])* $name:ident { $($variant:ident => $token:literal),+ $(,)? }) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $token),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownOperator;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($token => Ok($name::$variant),)+
                    _ => Err(UnknownOperator(s.to_string())),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

operator_enum!(UnaryOperator {
    Minus => "-",
    Plus => "+",
    LogicalNot => "!",
    BitwiseNot => "~",
    TypeOf => "typeof",
    Void => "void",
    Delete => "delete",
});

operator_enum!(UpdateOperator {
    PlusPlus => "++",
    MinusMinus => "--",
});

operator_enum!(
    /// Binary operators. `&&` and `||` live in [`LogicalOperator`] since they short-circuit.
    BinaryOperator {
        LooselyEqual => "==",
        LooselyUnequal => "!=",
        StrictlyEqual => "===",
        StrictlyUnequal => "!==",
        LessThan => "<",
        LessThanEqual => "<=",
        GreaterThan => ">",
        GreaterThanEqual => ">=",
        BitwiseLeftShift => "<<",
        BitwiseRightShift => ">>",
        BitwiseUnsignedRightShift => ">>>",
        Add => "+",
        Subtract => "-",
        Multiply => "*",
        Divide => "/",
        Modulo => "%",
        BitwiseOr => "|",
        BitwiseXor => "^",
        BitwiseAnd => "&",
        In => "in",
        InstanceOf => "instanceof",
    }
);

operator_enum!(LogicalOperator {
    Or => "||",
    And => "&&",
});

operator_enum!(AssignmentOperator {
    Equals => "=",
    AddEquals => "+=",
    SubtractEquals => "-=",
    MultiplyEquals => "*=",
    DivideEquals => "/=",
    ModuloEquals => "%=",
    BitwiseLeftShiftEquals => "<<=",
    BitwiseRightShiftEquals => ">>=",
    BitwiseUnsignedRightShiftEquals => ">>>=",
    BitwiseOrEquals => "|=",
    BitwiseXorEquals => "^=",
    BitwiseAndEquals => "&=",
});

impl AssignmentOperator {
    /// The binary operator a compound assignment applies, `None` for plain `=`.
    pub fn binary_operator(&self) -> Option<BinaryOperator> {
        Some(match self {
            AssignmentOperator::Equals => return None,
            AssignmentOperator::AddEquals => BinaryOperator::Add,
            AssignmentOperator::SubtractEquals => BinaryOperator::Subtract,
            AssignmentOperator::MultiplyEquals => BinaryOperator::Multiply,
            AssignmentOperator::DivideEquals => BinaryOperator::Divide,
            AssignmentOperator::ModuloEquals => BinaryOperator::Modulo,
            AssignmentOperator::BitwiseLeftShiftEquals => BinaryOperator::BitwiseLeftShift,
            AssignmentOperator::BitwiseRightShiftEquals => BinaryOperator::BitwiseRightShift,
            AssignmentOperator::BitwiseUnsignedRightShiftEquals => {
                BinaryOperator::BitwiseUnsignedRightShift
            }
            AssignmentOperator::BitwiseOrEquals => BinaryOperator::BitwiseOr,
            AssignmentOperator::BitwiseXorEquals => BinaryOperator::BitwiseXor,
            AssignmentOperator::BitwiseAndEquals => BinaryOperator::BitwiseAnd,
        })
    }
}
