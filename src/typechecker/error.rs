//! Semantic error kinds.
//!
//! Every kind is its own payload struct implementing `Display` and
//! `Error`; [`TypeCheckError`] pairs a kind with the span diagnostics are
//! anchored at. Errors accumulate during a pass and the pass fails at its
//! end with a [`SemanticCheckFailure`] carrying the collected list.

use std::error::Error;
use std::fmt::Display;

use crate::span::Span;
use crate::typechecker::types::Type;

#[derive(Clone, Debug, PartialEq)]
pub enum TypeCheckError {
    UndefinedSymbol(UndefinedSymbol, Span),
    UndefinedType(UndefinedType, Span),
    RedefinedSymbol(RedefinedSymbol, Span),
    RedefinedFunction(RedefinedFunction, Span),
    FunctionNotFound(FunctionNotFound, Span),
    AmbiguousCall(AmbiguousCall, Span),
    TypeMismatch(TypeMismatch, Span),
    BuiltinOperatorMismatch(BuiltinOperatorMismatch, Span),
    InvalidBuiltinOperator(InvalidBuiltinOperator, Span),
    NotCallable(NotCallable, Span),
    InvalidFunctionReference(InvalidFunctionReference, Span),
    CannotDeduceReturnType(CannotDeduceReturnType, Span),
    ConflictingReturnTypes(ConflictingReturnTypes, Span),
    ReturnTypeMismatch(ReturnTypeMismatch, Span),
    ProcReturnsValue(ProcReturnsValue, Span),
    ProcWithReturnType(ProcWithReturnType, Span),
    QueryFuncMustReturnBool(QueryFuncMustReturnBool, Span),
    PrivateMemberFunction(PrivateMemberFunction, Span),
    PrivateInstanceVar(PrivateInstanceVar, Span),
    MemberNotFound(MemberNotFound, Span),
    ImmutableReassign(ImmutableReassign, Span),
    ConstViolation(ConstViolation, Span),
    InvalidAssignee(InvalidAssignee, Span),
    CtorNotFound(CtorNotFound, Span),
    DoubleInit(DoubleInit, Span),
    SelfAccessBeforeInit(SelfAccessBeforeInit, Span),
    NotDefaultConstructible(NotDefaultConstructible, Span),
    CannotDetermineInstanceVarType(CannotDetermineInstanceVarType, Span),
    InstanceVarNotFound(InstanceVarNotFound, Span),
    InstanceVarOutsideCtor(InstanceVarOutsideCtor, Span),
    InstanceVarInitNotAllowed(InstanceVarInitNotAllowed, Span),
    InstanceVarTypeMismatch(InstanceVarTypeMismatch, Span),
    TemplateArityMismatch(TemplateArityMismatch, Span),
    ClassInstantiationFailure(ClassInstantiationFailure, Span),
    InvalidConstruction(InvalidConstruction, Span),
    InvalidIndexee(InvalidIndexee, Span),
    InvalidIndexType(InvalidIndexType, Span),
    InvalidTupleIndex(InvalidTupleIndex, Span),
    ConditionNotBool(ConditionNotBool, Span),
    IfBranchMismatch(IfBranchMismatch, Span),
    EmptyArrayLiteral(EmptyArrayLiteral, Span),
    SingleElementTuple(SingleElementTuple, Span),
    ArrayElementMismatch(ArrayElementMismatch, Span),
    InitializeArityMismatch(InitializeArityMismatch, Span),
    AssignmentArityMismatch(AssignmentArityMismatch, Span),
    MissingTypeAnnotation(MissingTypeAnnotation, Span),
    MissingMainFunction(MissingMainFunction, Span),
    MainCannotBeOverloaded(MainCannotBeOverloaded, Span),
    InvalidMainSignature(InvalidMainSignature, Span),
    MainParamMustBeImmutable(MainParamMustBeImmutable, Span),
    CannotInvokeMain(CannotInvokeMain, Span),
    NotIterable(NotIterable, Span),
    IterationArityMismatch(IterationArityMismatch, Span),
    EqMustReturnBool(EqMustReturnBool, Span),
    TypeofOutsideFunction(TypeofOutsideFunction, Span),
    NoCaptureFound(NoCaptureFound, Span),
    FailedToAnalyzeCallee(FailedToAnalyzeCallee, Span),
    NotImplemented(NotImplemented, Span),
}

impl TypeCheckError {
    pub fn span(&self) -> Span {
        use TypeCheckError::*;
        match self {
            UndefinedSymbol(_, s) | UndefinedType(_, s) | RedefinedSymbol(_, s)
            | RedefinedFunction(_, s) | FunctionNotFound(_, s) | AmbiguousCall(_, s)
            | TypeMismatch(_, s) | BuiltinOperatorMismatch(_, s) | InvalidBuiltinOperator(_, s)
            | NotCallable(_, s) | InvalidFunctionReference(_, s) | CannotDeduceReturnType(_, s)
            | ConflictingReturnTypes(_, s) | ReturnTypeMismatch(_, s) | ProcReturnsValue(_, s)
            | ProcWithReturnType(_, s) | QueryFuncMustReturnBool(_, s)
            | PrivateMemberFunction(_, s) | PrivateInstanceVar(_, s) | MemberNotFound(_, s)
            | ImmutableReassign(_, s) | ConstViolation(_, s) | InvalidAssignee(_, s)
            | CtorNotFound(_, s) | DoubleInit(_, s) | SelfAccessBeforeInit(_, s)
            | NotDefaultConstructible(_, s) | CannotDetermineInstanceVarType(_, s)
            | InstanceVarNotFound(_, s) | InstanceVarOutsideCtor(_, s)
            | InstanceVarInitNotAllowed(_, s) | InstanceVarTypeMismatch(_, s)
            | TemplateArityMismatch(_, s) | ClassInstantiationFailure(_, s)
            | InvalidConstruction(_, s) | InvalidIndexee(_, s) | InvalidIndexType(_, s)
            | InvalidTupleIndex(_, s) | ConditionNotBool(_, s) | IfBranchMismatch(_, s)
            | EmptyArrayLiteral(_, s) | SingleElementTuple(_, s) | ArrayElementMismatch(_, s)
            | InitializeArityMismatch(_, s) | AssignmentArityMismatch(_, s)
            | MissingTypeAnnotation(_, s) | MissingMainFunction(_, s)
            | MainCannotBeOverloaded(_, s) | InvalidMainSignature(_, s)
            | MainParamMustBeImmutable(_, s) | CannotInvokeMain(_, s) | NotIterable(_, s)
            | IterationArityMismatch(_, s) | EqMustReturnBool(_, s) | TypeofOutsideFunction(_, s)
            | NoCaptureFound(_, s) | FailedToAnalyzeCallee(_, s) | NotImplemented(_, s) => {
                s.clone()
            }
        }
    }

    pub fn message(&self) -> String {
        use TypeCheckError::*;
        match self {
            UndefinedSymbol(e, _) => e.to_string(),
            UndefinedType(e, _) => e.to_string(),
            RedefinedSymbol(e, _) => e.to_string(),
            RedefinedFunction(e, _) => e.to_string(),
            FunctionNotFound(e, _) => e.to_string(),
            AmbiguousCall(e, _) => e.to_string(),
            TypeMismatch(e, _) => e.to_string(),
            BuiltinOperatorMismatch(e, _) => e.to_string(),
            InvalidBuiltinOperator(e, _) => e.to_string(),
            NotCallable(e, _) => e.to_string(),
            InvalidFunctionReference(e, _) => e.to_string(),
            CannotDeduceReturnType(e, _) => e.to_string(),
            ConflictingReturnTypes(e, _) => e.to_string(),
            ReturnTypeMismatch(e, _) => e.to_string(),
            ProcReturnsValue(e, _) => e.to_string(),
            ProcWithReturnType(e, _) => e.to_string(),
            QueryFuncMustReturnBool(e, _) => e.to_string(),
            PrivateMemberFunction(e, _) => e.to_string(),
            PrivateInstanceVar(e, _) => e.to_string(),
            MemberNotFound(e, _) => e.to_string(),
            ImmutableReassign(e, _) => e.to_string(),
            ConstViolation(e, _) => e.to_string(),
            InvalidAssignee(e, _) => e.to_string(),
            CtorNotFound(e, _) => e.to_string(),
            DoubleInit(e, _) => e.to_string(),
            SelfAccessBeforeInit(e, _) => e.to_string(),
            NotDefaultConstructible(e, _) => e.to_string(),
            CannotDetermineInstanceVarType(e, _) => e.to_string(),
            InstanceVarNotFound(e, _) => e.to_string(),
            InstanceVarOutsideCtor(e, _) => e.to_string(),
            InstanceVarInitNotAllowed(e, _) => e.to_string(),
            InstanceVarTypeMismatch(e, _) => e.to_string(),
            TemplateArityMismatch(e, _) => e.to_string(),
            ClassInstantiationFailure(e, _) => e.to_string(),
            InvalidConstruction(e, _) => e.to_string(),
            InvalidIndexee(e, _) => e.to_string(),
            InvalidIndexType(e, _) => e.to_string(),
            InvalidTupleIndex(e, _) => e.to_string(),
            ConditionNotBool(e, _) => e.to_string(),
            IfBranchMismatch(e, _) => e.to_string(),
            EmptyArrayLiteral(e, _) => e.to_string(),
            SingleElementTuple(e, _) => e.to_string(),
            ArrayElementMismatch(e, _) => e.to_string(),
            InitializeArityMismatch(e, _) => e.to_string(),
            AssignmentArityMismatch(e, _) => e.to_string(),
            MissingTypeAnnotation(e, _) => e.to_string(),
            MissingMainFunction(e, _) => e.to_string(),
            MainCannotBeOverloaded(e, _) => e.to_string(),
            InvalidMainSignature(e, _) => e.to_string(),
            MainParamMustBeImmutable(e, _) => e.to_string(),
            CannotInvokeMain(e, _) => e.to_string(),
            NotIterable(e, _) => e.to_string(),
            IterationArityMismatch(e, _) => e.to_string(),
            EqMustReturnBool(e, _) => e.to_string(),
            TypeofOutsideFunction(e, _) => e.to_string(),
            NoCaptureFound(e, _) => e.to_string(),
            FailedToAnalyzeCallee(e, _) => e.to_string(),
            NotImplemented(e, _) => e.to_string(),
        }
    }
}

impl Display for TypeCheckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.span().to_string(self.message()).as_str())
    }
}

impl Error for TypeCheckError {}

/// A pass failed; carries everything it diagnosed.
#[derive(Clone, Debug, PartialEq)]
pub struct SemanticCheckFailure {
    pub pass: &'static str,
    pub errors: Vec<TypeCheckError>,
}

impl SemanticCheckFailure {
    pub fn new(pass: &'static str, errors: Vec<TypeCheckError>) -> SemanticCheckFailure {
        SemanticCheckFailure { pass, errors }
    }
}

impl Display for SemanticCheckFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} semantic error(s) generated in {}",
            self.errors.len(),
            self.pass
        )
    }
}

impl Error for SemanticCheckFailure {}

#[derive(Clone, Debug, PartialEq)]
pub struct UndefinedSymbol {
    pub name: String,
}

impl Display for UndefinedSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Symbol '{}' is not found", self.name)
    }
}

impl Error for UndefinedSymbol {}

#[derive(Clone, Debug, PartialEq)]
pub struct UndefinedType {
    pub name: String,
}

impl Display for UndefinedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid type '{}' is specified", self.name)
    }
}

impl Error for UndefinedType {}

#[derive(Clone, Debug, PartialEq)]
pub struct RedefinedSymbol {
    pub name: String,
}

impl Display for RedefinedSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Symbol '{}' is redefined", self.name)
    }
}

impl Error for RedefinedSymbol {}

#[derive(Clone, Debug, PartialEq)]
pub struct RedefinedFunction {
    pub situation: String,
    pub signature: String,
    pub previous: Span,
}

impl Display for RedefinedFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "In {}, '{}' is redefined\n  Note: Previous definition is at line:{}, col:{}",
            self.situation, self.signature, self.previous.line, self.previous.col
        )
    }
}

impl Error for RedefinedFunction {}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionNotFound {
    pub signature: String,
}

impl Display for FunctionNotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Function for '{}' is not found", self.signature)
    }
}

impl Error for FunctionNotFound {}

#[derive(Clone, Debug, PartialEq)]
pub struct AmbiguousCall {
    pub signature: String,
    pub candidates: Vec<String>,
}

impl Display for AmbiguousCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Function candidates for '{}' are ambiguous", self.signature)?;
        for candidate in &self.candidates {
            write!(f, "\n  Candidate: {candidate}")?;
        }
        Ok(())
    }
}

impl Error for AmbiguousCall {}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeMismatch {
    pub expected: Type,
    pub actual: Type,
}

impl Display for TypeMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Expected type '{}' but got '{}'",
            self.expected, self.actual
        )
    }
}

impl Error for TypeMismatch {}

#[derive(Clone, Debug, PartialEq)]
pub struct BuiltinOperatorMismatch {
    pub op: String,
    pub lhs: Type,
    pub rhs: Type,
}

impl Display for BuiltinOperatorMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Type mismatch in built-in binary operator '{}'\n  Note: Type of lhs is '{}'\n  Note: Type of rhs is '{}'\n  Note: User-defined operators for builtin types are not permitted",
            self.op, self.lhs, self.rhs
        )
    }
}

impl Error for BuiltinOperatorMismatch {}

#[derive(Clone, Debug, PartialEq)]
pub struct InvalidBuiltinOperator {
    pub op: String,
    pub ty: Type,
}

impl Display for InvalidBuiltinOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Operator '{}' can't be applied to type '{}'\n  Note: User-defined operators for builtin types are not permitted",
            self.op, self.ty
        )
    }
}

impl Error for InvalidBuiltinOperator {}

#[derive(Clone, Debug, PartialEq)]
pub struct NotCallable {
    pub ty: Type,
}

impl Display for NotCallable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Only function type can be called\n  Note: The type '{}' is not a function",
            self.ty
        )
    }
}

impl Error for NotCallable {}

#[derive(Clone, Debug, PartialEq)]
pub struct InvalidFunctionReference {
    pub ty: Type,
}

impl Display for InvalidFunctionReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' is an invalid function reference", self.ty)
    }
}

impl Error for InvalidFunctionReference {}

#[derive(Clone, Debug, PartialEq)]
pub struct CannotDeduceReturnType {
    pub function: String,
}

impl Display for CannotDeduceReturnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Can't deduce return type of function '{}' from return statement",
            self.function
        )
    }
}

impl Error for CannotDeduceReturnType {}

#[derive(Clone, Debug, PartialEq)]
pub struct ConflictingReturnTypes {
    pub function: String,
    pub candidates: Vec<Type>,
}

impl Display for ConflictingReturnTypes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let note = self
            .candidates
            .iter()
            .map(|t| format!("'{t}'"))
            .collect::<Vec<_>>()
            .join(" ");
        write!(
            f,
            "Conflict among return types in function '{}'\n  Note: Candidates are: {note}",
            self.function
        )
    }
}

impl Error for ConflictingReturnTypes {}

#[derive(Clone, Debug, PartialEq)]
pub struct ReturnTypeMismatch {
    pub function: String,
    pub specified: Type,
    pub deduced: Type,
}

impl Display for ReturnTypeMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Return type of function '{}' mismatch\n  Note: Specified type is '{}'\n  Note: Deduced type is '{}'",
            self.function, self.specified, self.deduced
        )
    }
}

impl Error for ReturnTypeMismatch {}

#[derive(Clone, Debug, PartialEq)]
pub struct ProcReturnsValue {
    pub function: String,
}

impl Display for ProcReturnsValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "proc '{}' can't return any value", self.function)
    }
}

impl Error for ProcReturnsValue {}

#[derive(Clone, Debug, PartialEq)]
pub struct ProcWithReturnType {
    pub function: String,
}

impl Display for ProcWithReturnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Procedure '{}' can't have return type", self.function)
    }
}

impl Error for ProcWithReturnType {}

#[derive(Clone, Debug, PartialEq)]
pub struct QueryFuncMustReturnBool {
    pub function: String,
}

impl Display for QueryFuncMustReturnBool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Function '{}' must return bool because it includes '?' in its name",
            self.function
        )
    }
}

impl Error for QueryFuncMustReturnBool {}

#[derive(Clone, Debug, PartialEq)]
pub struct PrivateMemberFunction {
    pub signature: String,
    pub class: String,
}

impl Display for PrivateMemberFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Member function '{}' is a private member of class '{}'",
            self.signature, self.class
        )
    }
}

impl Error for PrivateMemberFunction {}

#[derive(Clone, Debug, PartialEq)]
pub struct PrivateInstanceVar {
    pub name: String,
    pub class: String,
}

impl Display for PrivateInstanceVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}' is a private member of class '{}'",
            self.name, self.class
        )
    }
}

impl Error for PrivateInstanceVar {}

#[derive(Clone, Debug, PartialEq)]
pub struct MemberNotFound {
    pub name: String,
    pub ty: Type,
}

impl Display for MemberNotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "No member named '{}' is found in '{}'",
            self.name, self.ty
        )
    }
}

impl Error for MemberNotFound {}

#[derive(Clone, Debug, PartialEq)]
pub struct ImmutableReassign {
    pub name: String,
}

impl Display for ImmutableReassign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Can not reassign immutable variable '{}'", self.name)
    }
}

impl Error for ImmutableReassign {}

#[derive(Clone, Debug, PartialEq)]
pub struct ConstViolation {
    pub callee: String,
    pub binding: String,
}

impl Display for ConstViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Member function '{}' modifies member(s) of immutable object '{}'",
            self.callee, self.binding
        )
    }
}

impl Error for ConstViolation {}

#[derive(Clone, Debug, PartialEq)]
pub struct InvalidAssignee;

impl Display for InvalidAssignee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Assignee must be a variable, an index access or an instance variable"
        )
    }
}

impl Error for InvalidAssignee {}

#[derive(Clone, Debug, PartialEq)]
pub struct CtorNotFound {
    pub class: String,
}

impl Display for CtorNotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "No matching constructor to construct class '{}'",
            self.class
        )
    }
}

impl Error for CtorNotFound {}

#[derive(Clone, Debug, PartialEq)]
pub struct DoubleInit {
    pub name: String,
    pub first: Span,
}

impl Display for DoubleInit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Instance variable '{}' is initialized twice or more times\n  Note: Instance variable can only be initialized once\n  Note: First initialization is at line:{}, col:{}",
            self.name, self.first.line, self.first.col
        )
    }
}

impl Error for DoubleInit {}

#[derive(Clone, Debug, PartialEq)]
pub struct SelfAccessBeforeInit {
    /// The not-yet-initialized member the statement touches, when one
    /// could be named; plain `self` access otherwise.
    pub member: Option<String>,
    pub is_func: bool,
}

impl Display for SelfAccessBeforeInit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.member, self.is_func) {
            (Some(name), true) => write!(
                f,
                "Calling member function '{name}' is not permitted until all instance variables are initialized in constructor"
            ),
            (Some(name), false) => write!(
                f,
                "Access to instance variable '{name}' here is not permitted in constructor because '{name}' may not be initialized here yet"
            ),
            (None, _) => write!(
                f,
                "Access to 'self' is not permitted until all instance variables are initialized in constructor"
            ),
        }
    }
}

impl Error for SelfAccessBeforeInit {}

#[derive(Clone, Debug, PartialEq)]
pub struct NotDefaultConstructible {
    pub name: String,
    pub ty: Type,
}

impl Display for NotDefaultConstructible {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Instance variable '@{}' must be initialized explicitly in constructor because its type '{}' is not default constructible",
            self.name, self.ty
        )
    }
}

impl Error for NotDefaultConstructible {}

#[derive(Clone, Debug, PartialEq)]
pub struct CannotDetermineInstanceVarType {
    pub class: String,
    pub name: String,
}

impl Display for CannotDetermineInstanceVarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Failed to instantiate class template '{}'\n  Note: Type of instance variable '{}' can't be determined",
            self.class, self.name
        )
    }
}

impl Error for CannotDetermineInstanceVarType {}

#[derive(Clone, Debug, PartialEq)]
pub struct InstanceVarNotFound {
    pub name: String,
    pub class: String,
}

impl Display for InstanceVarNotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Instance variable '{}' is not defined in class '{}'",
            self.name, self.class
        )
    }
}

impl Error for InstanceVarNotFound {}

#[derive(Clone, Debug, PartialEq)]
pub struct InstanceVarOutsideCtor {
    pub name: String,
}

impl Display for InstanceVarOutsideCtor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Instance variable '{}' can be initialized only in constructor",
            self.name
        )
    }
}

impl Error for InstanceVarOutsideCtor {}

#[derive(Clone, Debug, PartialEq)]
pub struct InstanceVarInitNotAllowed {
    pub name: String,
}

impl Display for InstanceVarInitNotAllowed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Instance variable initializer '{}' is not permitted here",
            self.name
        )
    }
}

impl Error for InstanceVarInitNotAllowed {}

#[derive(Clone, Debug, PartialEq)]
pub struct InstanceVarTypeMismatch {
    pub name: String,
    pub expected: Type,
    pub actual: Type,
}

impl Display for InstanceVarTypeMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Type of instance variable '{}' mismatches\n  Note: Tried to substitute type '{}' but it was actually type '{}'",
            self.name, self.expected, self.actual
        )
    }
}

impl Error for InstanceVarTypeMismatch {}

#[derive(Clone, Debug, PartialEq)]
pub struct TemplateArityMismatch {
    pub class: String,
    pub specified: usize,
    pub templates: usize,
}

impl Display for TemplateArityMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Number of specified template types mismatches\n  Note: You specified {} but class '{}' has {} template(s)",
            self.specified, self.class, self.templates
        )
    }
}

impl Error for TemplateArityMismatch {}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassInstantiationFailure {
    pub class: String,
    pub ctor: String,
}

impl Display for ClassInstantiationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Failed to instantiate class '{}' with constructor '{}'",
            self.class, self.ctor
        )
    }
}

impl Error for ClassInstantiationFailure {}

#[derive(Clone, Debug, PartialEq)]
pub struct InvalidConstruction {
    pub ty: Type,
    pub note: String,
}

impl Display for InvalidConstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Invalid object construction for type '{}'\n  Note: {}",
            self.ty, self.note
        )
    }
}

impl Error for InvalidConstruction {}

#[derive(Clone, Debug, PartialEq)]
pub struct InvalidIndexee {
    pub ty: Type,
    pub index: Type,
}

impl Display for InvalidIndexee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Index access operator '[]' for '{}' indexed by '{}' is not found",
            self.ty, self.index
        )
    }
}

impl Error for InvalidIndexee {}

#[derive(Clone, Debug, PartialEq)]
pub struct InvalidIndexType {
    pub container: Type,
    pub index: Type,
}

impl Display for InvalidIndexType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Index of '{}' must be int or uint but actually '{}'",
            self.container, self.index
        )
    }
}

impl Error for InvalidIndexType {}

#[derive(Clone, Debug, PartialEq)]
pub struct InvalidTupleIndex {
    pub detail: String,
}

impl Display for InvalidTupleIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.detail)
    }
}

impl Error for InvalidTupleIndex {}

#[derive(Clone, Debug, PartialEq)]
pub struct ConditionNotBool {
    pub ty: Type,
}

impl Display for ConditionNotBool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Type of condition must be bool\n  Note: Type of condition is '{}'",
            self.ty
        )
    }
}

impl Error for ConditionNotBool {}

#[derive(Clone, Debug, PartialEq)]
pub struct IfBranchMismatch {
    pub then_type: Type,
    pub else_type: Type,
}

impl Display for IfBranchMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Type mismatch between type of then clause and else clause\n  Note: Type of then clause is '{}'\n  Note: Type of else clause is '{}'",
            self.then_type, self.else_type
        )
    }
}

impl Error for IfBranchMismatch {}

#[derive(Clone, Debug, PartialEq)]
pub struct EmptyArrayLiteral;

impl Display for EmptyArrayLiteral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Empty array literal must be annotated with its type by ':'"
        )
    }
}

impl Error for EmptyArrayLiteral {}

#[derive(Clone, Debug, PartialEq)]
pub struct SingleElementTuple;

impl Display for SingleElementTuple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Size of tuple must not be 1")
    }
}

impl Error for SingleElementTuple {}

#[derive(Clone, Debug, PartialEq)]
pub struct ArrayElementMismatch {
    pub expected: Type,
    pub actual: Type,
}

impl Display for ArrayElementMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Types of elements in array must be the same\n  Note: First element is '{}' but another element is '{}'",
            self.expected, self.actual
        )
    }
}

impl Error for ArrayElementMismatch {}

#[derive(Clone, Debug, PartialEq)]
pub struct InitializeArityMismatch {
    pub lhs: usize,
    pub rhs: usize,
}

impl Display for InitializeArityMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Number of variables and initializers mismatches\n  Note: {} variable(s) but {} initializer(s)",
            self.lhs, self.rhs
        )
    }
}

impl Error for InitializeArityMismatch {}

#[derive(Clone, Debug, PartialEq)]
pub struct AssignmentArityMismatch {
    pub lhs: usize,
    pub rhs: usize,
}

impl Display for AssignmentArityMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Number of assignees and values mismatches\n  Note: {} assignee(s) but {} value(s)",
            self.lhs, self.rhs
        )
    }
}

impl Error for AssignmentArityMismatch {}

#[derive(Clone, Debug, PartialEq)]
pub struct MissingTypeAnnotation {
    pub name: String,
}

impl Display for MissingTypeAnnotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Variable '{}' needs a type annotation or an initializer",
            self.name
        )
    }
}

impl Error for MissingTypeAnnotation {}

#[derive(Clone, Debug, PartialEq)]
pub struct MissingMainFunction;

impl Display for MissingMainFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entry point 'main' is not found")
    }
}

impl Error for MissingMainFunction {}

#[derive(Clone, Debug, PartialEq)]
pub struct MainCannotBeOverloaded {
    pub candidates: Vec<String>,
}

impl Display for MainCannotBeOverloaded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Main function can't be overloaded")?;
        for candidate in &self.candidates {
            write!(f, "\n  Candidate: {candidate}")?;
        }
        Ok(())
    }
}

impl Error for MainCannotBeOverloaded {}

#[derive(Clone, Debug, PartialEq)]
pub struct InvalidMainSignature {
    pub signature: String,
}

impl Display for InvalidMainSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Illegal signature for main function: '{}'\n  Note: main() or main(argv) is required",
            self.signature
        )
    }
}

impl Error for InvalidMainSignature {}

#[derive(Clone, Debug, PartialEq)]
pub struct MainParamMustBeImmutable {
    pub name: String,
}

impl Display for MainParamMustBeImmutable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Parameter of main function '{}' must be immutable",
            self.name
        )
    }
}

impl Error for MainParamMustBeImmutable {}

#[derive(Clone, Debug, PartialEq)]
pub struct CannotInvokeMain;

impl Display for CannotInvokeMain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "You can't invoke 'main' function")
    }
}

impl Error for CannotInvokeMain {}

#[derive(Clone, Debug, PartialEq)]
pub struct NotIterable {
    pub ty: Type,
}

impl Display for NotIterable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Type '{}' can't be iterated\n  Note: Iteration requires an array or a class with 'size' and '[]' member functions",
            self.ty
        )
    }
}

impl Error for NotIterable {}

#[derive(Clone, Debug, PartialEq)]
pub struct IterationArityMismatch {
    pub vars: usize,
    pub elems: usize,
}

impl Display for IterationArityMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Number of iteration variables mismatches\n  Note: {} variable(s) but element is a tuple of {}",
            self.vars, self.elems
        )
    }
}

impl Error for IterationArityMismatch {}

#[derive(Clone, Debug, PartialEq)]
pub struct EqMustReturnBool {
    pub signature: String,
    pub actual: Type,
}

impl Display for EqMustReturnBool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'==' operator '{}' must return bool but actually returns '{}'",
            self.signature, self.actual
        )
    }
}

impl Error for EqMustReturnBool {}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeofOutsideFunction;

impl Display for TypeofOutsideFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'typeof' is only available inside a function body")
    }
}

impl Error for TypeofOutsideFunction {}

#[derive(Clone, Debug, PartialEq)]
pub struct NoCaptureFound {
    pub name: String,
    pub lambda: String,
}

impl Display for NoCaptureFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "No capture for '{}' is found in '{}'",
            self.name, self.lambda
        )
    }
}

impl Error for NoCaptureFound {}

#[derive(Clone, Debug, PartialEq)]
pub struct FailedToAnalyzeCallee {
    pub signature: String,
    pub at: Span,
}

impl Display for FailedToAnalyzeCallee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Failed to analyze function '{}' defined at line:{}, col:{}",
            self.signature, self.at.line, self.at.col
        )
    }
}

impl Error for FailedToAnalyzeCallee {}

#[derive(Clone, Debug, PartialEq)]
pub struct NotImplemented {
    pub feature: &'static str,
}

impl Display for NotImplemented {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} is not implemented yet\n  Note: You can contribute to Dachs by implementing this feature",
            self.feature
        )
    }
}

impl Error for NotImplemented {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_rendering_includes_span() {
        let err = TypeCheckError::UndefinedSymbol(
            UndefinedSymbol { name: "foo".into() },
            Span::new("main.dcs", 2, 5, 3),
        );
        let rendered = err.to_string();
        assert!(rendered.starts_with("Error in main.dcs:2:5"));
        assert!(rendered.contains("Symbol 'foo' is not found"));
    }

    #[test]
    fn test_failure_carries_count_and_pass() {
        let errors = vec![
            TypeCheckError::MissingMainFunction(MissingMainFunction, Span::default()),
            TypeCheckError::SingleElementTuple(SingleElementTuple, Span::default()),
        ];
        let failure = SemanticCheckFailure::new("symbol resolution", errors);
        assert_eq!(
            failure.to_string(),
            "2 semantic error(s) generated in symbol resolution"
        );
    }

    #[test]
    fn test_function_not_found_message() {
        let err = FunctionNotFound {
            signature: "foo(float)".into(),
        };
        assert_eq!(err.to_string(), "Function for 'foo(float)' is not found");
    }
}
