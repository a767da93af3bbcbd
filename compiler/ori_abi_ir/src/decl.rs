//! Resolved declarations.
//!
//! This is the hand-off format from type checking: every declaration here
//! is already resolved, its types are interned in the module's pool, and
//! its generic requirements have been solved.
//!
//! Generic parameters are numbered flat across the enclosing contexts: a
//! nominal nested in `Outer<A, B>` that introduces `C` sees `A = 0`, `B = 1`,
//! `C = 2`. Methods continue the numbering after their parent type.

use smallvec::SmallVec;

use crate::{Idx, Name, Pool, StringInterner, Tag};

/// Index of a nominal declaration in its [`Module`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct NominalId(u32);

impl NominalId {
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Index of a function declaration in its [`Module`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct FunctionId(u32);

impl FunctionId {
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// One case of an enum declaration.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct EnumCaseId {
    pub decl: NominalId,
    pub index: u32,
}

/// A runtime witness a generic context needs.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum GenericRequirementKind {
    /// The type metadata of `ty`.
    Metadata,
    /// The witness table proving `ty: protocol`.
    WitnessTable { protocol: Name },
}

/// A solved generic requirement on a generic parameter.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct GenericRequirement {
    /// The generic parameter the requirement is about.
    pub ty: Idx,
    pub kind: GenericRequirementKind,
}

impl GenericRequirement {
    pub const fn metadata(ty: Idx) -> Self {
        Self {
            ty,
            kind: GenericRequirementKind::Metadata,
        }
    }

    pub const fn witness_table(ty: Idx, protocol: Name) -> Self {
        Self {
            ty,
            kind: GenericRequirementKind::WitnessTable { protocol },
        }
    }

    #[inline]
    pub const fn is_metadata(&self) -> bool {
        matches!(self.kind, GenericRequirementKind::Metadata)
    }
}

/// How a parameter is handed to the callee at the language level.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum ParamConvention {
    /// Callee takes ownership.
    #[default]
    Owned,
    /// Callee borrows for the duration of the call.
    Borrowed,
    /// Callee may mutate the caller's storage; always passed by address.
    InOut,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ParamDecl {
    pub name: Name,
    pub ty: Idx,
    pub convention: ParamConvention,
}

impl ParamDecl {
    pub fn new(name: Name, ty: Idx) -> Self {
        Self {
            name,
            ty,
            convention: ParamConvention::Owned,
        }
    }

    #[must_use]
    pub fn with_convention(mut self, convention: ParamConvention) -> Self {
        self.convention = convention;
        self
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct FieldDecl {
    pub name: Name,
    pub ty: Idx,
}

impl FieldDecl {
    pub fn new(name: Name, ty: Idx) -> Self {
        Self { name, ty }
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct EnumCaseDecl {
    pub name: Name,
    /// Associated value, `None` for payload-free cases.
    pub payload: Option<Idx>,
}

impl EnumCaseDecl {
    pub fn unit(name: Name) -> Self {
        Self {
            name,
            payload: None,
        }
    }

    pub fn with_payload(name: Name, payload: Idx) -> Self {
        Self {
            name,
            payload: Some(payload),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum NominalKind {
    Struct { fields: Vec<FieldDecl> },
    Enum { cases: Vec<EnumCaseDecl> },
    Class,
}

/// A struct, enum, or class declaration.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct NominalDecl {
    pub name: Name,
    /// Enclosing nominal for nested types.
    pub parent: Option<NominalId>,
    /// Generic parameters introduced by this declaration (not the parent's).
    pub generic_params: Vec<Name>,
    /// Conformance requirements introduced by this declaration.
    pub requirements: Vec<GenericRequirement>,
    /// Layout is hidden behind a library-evolution boundary.
    pub is_resilient: bool,
    pub kind: NominalKind,
}

impl NominalDecl {
    fn new(name: Name, kind: NominalKind) -> Self {
        Self {
            name,
            parent: None,
            generic_params: Vec::new(),
            requirements: Vec::new(),
            is_resilient: false,
            kind,
        }
    }

    pub fn structure(name: Name, fields: Vec<FieldDecl>) -> Self {
        Self::new(name, NominalKind::Struct { fields })
    }

    pub fn enumeration(name: Name, cases: Vec<EnumCaseDecl>) -> Self {
        Self::new(name, NominalKind::Enum { cases })
    }

    pub fn class(name: Name) -> Self {
        Self::new(name, NominalKind::Class)
    }

    #[must_use]
    pub fn with_parent(mut self, parent: NominalId) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub fn with_generic_params(mut self, params: Vec<Name>) -> Self {
        self.generic_params = params;
        self
    }

    #[must_use]
    pub fn with_requirements(mut self, requirements: Vec<GenericRequirement>) -> Self {
        self.requirements = requirements;
        self
    }

    #[must_use]
    pub fn resilient(mut self) -> Self {
        self.is_resilient = true;
        self
    }

    pub fn tag(&self) -> Tag {
        match self.kind {
            NominalKind::Struct { .. } => Tag::Struct,
            NominalKind::Enum { .. } => Tag::Enum,
            NominalKind::Class => Tag::Class,
        }
    }

    pub fn enum_cases(&self) -> Option<&[EnumCaseDecl]> {
        match &self.kind {
            NominalKind::Enum { cases } => Some(cases),
            _ => None,
        }
    }
}

/// A function, method, or initializer declaration.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct FunctionDecl {
    pub name: Name,
    /// The type this function is a member of.
    pub parent: Option<NominalId>,
    /// Generic parameters introduced by the function itself.
    pub generic_params: Vec<Name>,
    /// Every requirement a call must witness, including the parent's.
    pub requirements: Vec<GenericRequirement>,
    /// Explicit parameters in declaration order.
    pub params: Vec<ParamDecl>,
    /// The receiver, for instance methods.
    pub self_param: Option<ParamDecl>,
    /// Formal results in order; empty for `()`.
    pub results: SmallVec<[Idx; 1]>,
    pub throws: bool,
}

impl FunctionDecl {
    pub fn new(name: Name, params: Vec<ParamDecl>, results: &[Idx]) -> Self {
        Self {
            name,
            parent: None,
            generic_params: Vec::new(),
            requirements: Vec::new(),
            params,
            self_param: None,
            results: results.iter().copied().collect(),
            throws: false,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: NominalId) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub fn with_generic_params(mut self, params: Vec<Name>) -> Self {
        self.generic_params = params;
        self
    }

    #[must_use]
    pub fn with_requirements(mut self, requirements: Vec<GenericRequirement>) -> Self {
        self.requirements = requirements;
        self
    }

    #[must_use]
    pub fn with_self(mut self, receiver: ParamDecl) -> Self {
        self.self_param = Some(receiver);
        self
    }

    #[must_use]
    pub fn throwing(mut self) -> Self {
        self.throws = true;
        self
    }
}

/// A type-checked module: the unit an ABI provider is bound to.
#[derive(Debug)]
pub struct Module {
    name: Name,
    interner: StringInterner,
    pool: Pool,
    nominals: Vec<NominalDecl>,
    functions: Vec<FunctionDecl>,
}

impl Module {
    pub fn new(name: &str) -> Self {
        let interner = StringInterner::new();
        let name = interner.intern(name);
        Self {
            name,
            interner,
            pool: Pool::new(),
            nominals: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn name(&self) -> Name {
        self.name
    }

    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn intern(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    pub fn lookup(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }

    pub fn add_nominal(&mut self, decl: NominalDecl) -> NominalId {
        let id = NominalId(
            u32::try_from(self.nominals.len())
                .unwrap_or_else(|_| panic!("too many nominal declarations")),
        );
        self.nominals.push(decl);
        id
    }

    pub fn add_function(&mut self, decl: FunctionDecl) -> FunctionId {
        let id = FunctionId(
            u32::try_from(self.functions.len())
                .unwrap_or_else(|_| panic!("too many function declarations")),
        );
        self.functions.push(decl);
        id
    }

    pub fn nominal(&self, id: NominalId) -> Option<&NominalDecl> {
        self.nominals.get(id.0 as usize)
    }

    /// Mutable access for declarations that refer to each other.
    pub fn nominal_mut(&mut self, id: NominalId) -> Option<&mut NominalDecl> {
        self.nominals.get_mut(id.0 as usize)
    }

    pub fn function(&self, id: FunctionId) -> Option<&FunctionDecl> {
        self.functions.get(id.0 as usize)
    }

    pub fn nominals(&self) -> impl Iterator<Item = (NominalId, &NominalDecl)> {
        (0u32..).map(NominalId).zip(self.nominals.iter())
    }

    pub fn functions(&self) -> impl Iterator<Item = (FunctionId, &FunctionDecl)> {
        (0u32..).map(FunctionId).zip(self.functions.iter())
    }

    /// Number of generic parameters in scope for `id`, parents included.
    pub fn generic_param_count(&self, id: NominalId) -> usize {
        let mut count = 0;
        let mut current = Some(id);
        // Bounded by the number of declarations in case of a malformed parent cycle.
        for _ in 0..=self.nominals.len() {
            let Some(decl) = current.and_then(|id| self.nominal(id)) else {
                break;
            };
            count += decl.generic_params.len();
            current = decl.parent;
        }
        count
    }

    /// The declaration chain from the outermost parent down to `id`.
    pub fn context_chain(&self, id: NominalId) -> SmallVec<[NominalId; 4]> {
        let mut chain = SmallVec::new();
        let mut current = Some(id);
        for _ in 0..=self.nominals.len() {
            let Some(this) = current else { break };
            let Some(decl) = self.nominal(this) else { break };
            chain.push(this);
            current = decl.parent;
        }
        chain.reverse();
        chain
    }

    /// `id` applied to `args`, using the variant matching the declaration kind.
    pub fn nominal_type(&self, id: NominalId, args: &[Idx]) -> Option<Idx> {
        let decl = self.nominal(id)?;
        Some(match decl.kind {
            NominalKind::Struct { .. } => self.pool.struct_type(id, args),
            NominalKind::Enum { .. } => self.pool.enum_type(id, args),
            NominalKind::Class => self.pool.class_type(id, args),
        })
    }

    /// The generic parameter types in scope for `id`, in flat index order.
    pub fn generic_param_types(&self, id: NominalId) -> Vec<Idx> {
        let mut params = Vec::new();
        for ctx in self.context_chain(id) {
            let Some(decl) = self.nominal(ctx) else { continue };
            for &name in &decl.generic_params {
                let index = u32::try_from(params.len()).unwrap_or(u32::MAX);
                params.push(self.pool.generic_param(index, name));
            }
        }
        params
    }

    /// The unspecialised type of a declaration: applied to its own parameters.
    pub fn declared_type(&self, id: NominalId) -> Option<Idx> {
        let params = self.generic_param_types(id);
        self.nominal_type(id, &params)
    }

    /// Flat index of the first generic parameter a function introduces.
    pub fn function_generic_base(&self, decl: &FunctionDecl) -> usize {
        decl.parent.map_or(0, |parent| self.generic_param_count(parent))
    }
}
