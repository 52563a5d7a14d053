//! Form schema model
//!
//! The model is an arena-backed tree describing a form's data schema. The
//! external form-definition loader builds it once; the export core consumes
//! it read-only. Back references from a node to its nearest repeatable
//! ancestor are stored as indices into the arena, never as owning links.

/// Handle to a node inside a [`Model`] arena.
pub type NodeId = usize;

/// Primitive type of a field node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Text,
    Int,
    Decimal,
    Boolean,
    Date,
    Time,
    DateTime,
    Geopoint,
    Geotrace,
    Geoshape,
    Binary,
    SelectOne,
    SelectMultiple,
}

impl DataType {
    /// Maps an XForms bind type to a [`DataType`]. Unknown types fall back
    /// to `Text`, matching how collection clients treat them.
    pub fn from_xform(bind_type: &str) -> Self {
        match bind_type {
            "int" | "integer" => DataType::Int,
            "decimal" => DataType::Decimal,
            "boolean" => DataType::Boolean,
            "date" => DataType::Date,
            "time" => DataType::Time,
            "dateTime" => DataType::DateTime,
            "geopoint" => DataType::Geopoint,
            "geotrace" => DataType::Geotrace,
            "geoshape" => DataType::Geoshape,
            "binary" => DataType::Binary,
            "select1" => DataType::SelectOne,
            "select" => DataType::SelectMultiple,
            _ => DataType::Text,
        }
    }
}

/// Structural kind of a model node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Group,
    Repeat,
    Field(DataType),
}

/// One node of the form schema tree.
#[derive(Debug, Clone)]
pub struct ModelNode {
    name: String,
    fqn: String,
    kind: NodeKind,
    parent: Option<NodeId>,
    enclosing_repeat: Option<NodeId>,
    children: Vec<NodeId>,
}

impl ModelNode {
    /// Local name of the node.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fully qualified name: slash-joined path below the instance root.
    /// The root node itself has an empty fqn.
    pub fn fqn(&self) -> &str {
        &self.fqn
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_repeat(&self) -> bool {
        matches!(self.kind, NodeKind::Repeat)
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group)
    }

    /// Primitive type when the node is a field.
    pub fn data_type(&self) -> Option<DataType> {
        match self.kind {
            NodeKind::Field(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Nearest repeatable ancestor, or `None` when the next repeat boundary
    /// above this node is the instance root.
    pub fn enclosing_repeat(&self) -> Option<NodeId> {
        self.enclosing_repeat
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// The form schema tree. Child order mirrors form declaration order.
#[derive(Debug, Clone)]
pub struct Model {
    nodes: Vec<ModelNode>,
    root: NodeId,
}

impl Model {
    /// Starts building a model whose instance root carries `root_name`.
    pub fn builder(root_name: impl Into<String>) -> ModelBuilder {
        ModelBuilder::new(root_name.into())
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &ModelNode {
        &self.nodes[id]
    }

    /// Ordered children of a node.
    pub fn children_of(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id].children.iter().copied()
    }

    /// Every repeat node in depth-first pre-order.
    pub fn repeatable_fields(&self) -> Vec<NodeId> {
        let mut repeats = Vec::new();
        self.collect_repeats(self.root, &mut repeats);
        repeats
    }

    fn collect_repeats(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if self.nodes[id].is_repeat() {
            out.push(id);
        }
        for child in &self.nodes[id].children {
            self.collect_repeats(*child, out);
        }
    }

    pub fn fqn(&self, id: NodeId) -> &str {
        &self.nodes[id].fqn
    }

    /// Chain of node ids from (but excluding) the root down to `id`.
    pub fn path_from_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(node) = cursor {
            if node == self.root {
                break;
            }
            chain.push(node);
            cursor = self.nodes[node].parent;
        }
        chain.reverse();
        chain
    }
}

/// Builder used by the form-definition loader and by tests.
///
/// Groups and repeats are opened and closed explicitly; fields attach to
/// whatever scope is currently open.
#[derive(Debug)]
pub struct ModelBuilder {
    nodes: Vec<ModelNode>,
    stack: Vec<NodeId>,
}

impl ModelBuilder {
    fn new(root_name: String) -> Self {
        let root = ModelNode {
            name: root_name,
            fqn: String::new(),
            kind: NodeKind::Group,
            parent: None,
            enclosing_repeat: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            stack: vec![0],
        }
    }

    fn push_node(&mut self, name: String, kind: NodeKind) -> NodeId {
        let parent = *self.stack.last().unwrap_or(&0);
        let parent_node = &self.nodes[parent];
        let fqn = if parent_node.fqn.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", parent_node.fqn, name)
        };
        let enclosing_repeat = if parent_node.is_repeat() {
            Some(parent)
        } else {
            parent_node.enclosing_repeat
        };
        let id = self.nodes.len();
        self.nodes.push(ModelNode {
            name,
            fqn,
            kind,
            parent: Some(parent),
            enclosing_repeat,
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub fn field(&mut self, name: impl Into<String>, data_type: DataType) -> &mut Self {
        self.push_node(name.into(), NodeKind::Field(data_type));
        self
    }

    pub fn start_group(&mut self, name: impl Into<String>) -> &mut Self {
        let id = self.push_node(name.into(), NodeKind::Group);
        self.stack.push(id);
        self
    }

    pub fn end_group(&mut self) -> &mut Self {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
        self
    }

    pub fn start_repeat(&mut self, name: impl Into<String>) -> &mut Self {
        let id = self.push_node(name.into(), NodeKind::Repeat);
        self.stack.push(id);
        self
    }

    pub fn end_repeat(&mut self) -> &mut Self {
        self.end_group()
    }

    pub fn build(&mut self) -> Model {
        Model {
            nodes: std::mem::take(&mut self.nodes),
            root: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_model() -> Model {
        let mut b = Model::builder("data");
        b.field("name", DataType::Text);
        b.start_group("location");
        b.field("gps", DataType::Geopoint);
        b.end_group();
        b.start_repeat("g1");
        b.field("x", DataType::Int);
        b.start_repeat("g2");
        b.field("y", DataType::Text);
        b.end_repeat();
        b.end_repeat();
        b.build()
    }

    #[test]
    fn test_fqn_joins_with_slashes_below_root() {
        let model = sample_model();
        let fqns: Vec<&str> = model
            .repeatable_fields()
            .into_iter()
            .map(|id| model.fqn(id))
            .collect();
        assert_eq!(fqns, vec!["g1", "g1/g2"]);
    }

    #[test]
    fn test_repeatable_fields_in_preorder() {
        let model = sample_model();
        let names: Vec<&str> = model
            .repeatable_fields()
            .into_iter()
            .map(|id| model.node(id).name())
            .collect();
        assert_eq!(names, vec!["g1", "g2"]);
    }

    #[test]
    fn test_enclosing_repeat_backrefs() {
        let model = sample_model();
        let repeats = model.repeatable_fields();
        let g1 = repeats[0];
        let g2 = repeats[1];
        assert_eq!(model.node(g1).enclosing_repeat(), None);
        assert_eq!(model.node(g2).enclosing_repeat(), Some(g1));
    }

    #[test]
    fn test_child_order_mirrors_declaration() {
        let model = sample_model();
        let names: Vec<&str> = model
            .children_of(model.root())
            .map(|id| model.node(id).name())
            .collect();
        assert_eq!(names, vec!["name", "location", "g1"]);
    }

    #[test]
    fn test_path_from_root() {
        let model = sample_model();
        let g2 = model.repeatable_fields()[1];
        let path: Vec<&str> = model
            .path_from_root(g2)
            .into_iter()
            .map(|id| model.node(id).name())
            .collect();
        assert_eq!(path, vec!["g1", "g2"]);
    }

    #[test]
    fn test_data_type_from_xform() {
        assert_eq!(DataType::from_xform("geopoint"), DataType::Geopoint);
        assert_eq!(DataType::from_xform("select1"), DataType::SelectOne);
        assert_eq!(DataType::from_xform("barcode"), DataType::Text);
    }
}
