use serde::{Deserialize, Serialize};

/// Sentinel emitted for variables declared without an initializer.
pub const UNINIT: &str = "UNINIT";

/// Top-level POU (Program Organisation Unit) structure.
/// Built once by a frontend adapter and treated as immutable afterwards;
/// report generation and rendering only read it.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Program {
    /// POU name from the `PROGRAM` header.
    pub name: String,
    /// Variables in declaration order, all kinds interleaved as declared.
    pub variables: Vec<Variable>,
    /// Block instances of the FBD body, in source order.
    pub blocks: Vec<Block>,
    /// Wire statements of the FBD body.
    pub connections: Vec<Connection>,
    /// Optional grouping metadata (e.g. "Inputs"/"Outputs"), source order.
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl Program {
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn block(&self, name: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.name == name)
    }

    /// Exact count of variables of one kind; no caching.
    pub fn count_of_kind(&self, kind: VarKind) -> usize {
        self.variables.iter().filter(|v| v.kind == kind).count()
    }
}

/// Declared kind of a variable, from the section keyword it appeared under.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    InputVar,
    OutputVar,
    InOutVar,
    LocalVar,
}

impl VarKind {
    /// Fixed emission order for the report's metrics lines.
    pub const ALL: [VarKind; 4] = [
        VarKind::InputVar,
        VarKind::OutputVar,
        VarKind::InOutVar,
        VarKind::LocalVar,
    ];

    /// Label used inside the report's variable tuples.
    pub fn label(&self) -> &'static str {
        match self {
            VarKind::InputVar => "InputVar",
            VarKind::OutputVar => "OutputVar",
            VarKind::InOutVar => "InOutVar",
            VarKind::LocalVar => "LocalVar",
        }
    }

    /// Plural label used in `Num_<Kind>:` metrics lines.
    pub fn metric_label(&self) -> &'static str {
        match self {
            VarKind::InputVar => "Inputs",
            VarKind::OutputVar => "Outputs",
            VarKind::InOutVar => "InOuts",
            VarKind::LocalVar => "Locals",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Variable {
    /// Unique across the whole program, regardless of kind.
    pub name: String,
    pub kind: VarKind,
    /// Declared type identifier, e.g. `UINT`, `SAFEBOOL`.
    pub data_type: String,
    /// Literal initializer token; `None` when none was declared.
    #[serde(default)]
    pub init_value: Option<String>,
    #[serde(default)]
    pub comment: String,
}

impl Variable {
    /// Initializer as it appears in report tuples: the literal, or `UNINIT`.
    pub fn init_or_uninit(&self) -> &str {
        self.init_value.as_deref().unwrap_or(UNINIT)
    }
}

/// 2-D layout coordinate as stored in the POU source (unscaled).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDirection {
    In,
    Out,
}

/// Named connection point on a block instance.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Pin {
    pub name: String,
    pub direction: PinDirection,
}

/// FBD block instance: name, type, optional layout position, ordered pins.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Block {
    pub name: String,
    pub type_name: String,
    /// Absent when the source carried no `AT` clause; the renderer
    /// refuses to place such a block rather than defaulting a position.
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub pins: Vec<Pin>,
}

impl Block {
    pub fn pin(&self, name: &str) -> Option<&Pin> {
        self.pins.iter().find(|p| p.name == name)
    }

    pub fn pins_of(&self, direction: PinDirection) -> impl Iterator<Item = &Pin> {
        self.pins.iter().filter(move |p| p.direction == direction)
    }
}

/// One endpoint of a wire: `(block-or-variable name, pin name)`.
/// A bare variable endpoint uses its own name as the pin name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub owner: String,
    pub pin: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Connection {
    pub source: Endpoint,
    pub dest: Endpoint,
}

/// Named logical grouping of variables, kept in source order.
/// Membership is recorded as declared; a member whose kind disagrees
/// with the group's role is tolerated (the report uses declared kinds).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Group {
    pub name: String,
    pub members: Vec<String>,
}
