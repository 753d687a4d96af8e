#![allow(dead_code)]

use chrono::NaiveDate;
use triplemap::mapping::{DescriptorBuilder, SparqlModel};
use triplemap::model::{Datatype, ParentRef, ResourceModel, TreeLink, TreeModel, Value};
use triplemap::rdf::{vocab, NamedNode, Quad};
use triplemap::MemoryStore;

pub const VOCAB: &str = "http://example.org/vocab#";
pub const DEVICE: &str = "http://example.org/vocab#Device";
pub const SENSOR: &str = "http://example.org/vocab#Sensor";
pub const AREA: &str = "http://example.org/vocab#Area";
pub const FACILITY: &str = "http://example.org/vocab#Facility";
pub const DEVICES_GRAPH: &str = "http://example.org/set/devices";
pub const AREAS_GRAPH: &str = "http://example.org/set/areas";
pub const FACILITIES_GRAPH: &str = "http://example.org/set/facilities";
pub const ONTOLOGY_GRAPH: &str = "http://example.org/ontology";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn node(iri: &str) -> NamedNode {
    NamedNode::new(iri).unwrap()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Device {
    pub resource: ResourceModel,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub removal: Option<NaiveDate>,
    pub tags: Vec<String>,
}

impl Device {
    pub fn new(uri: &str, brand: &str) -> Self {
        Self {
            resource: ResourceModel::with_uri(uri),
            brand: Some(brand.to_string()),
            ..Default::default()
        }
    }
}

impl SparqlModel for Device {
    const RDF_TYPE: &'static str = DEVICE;
    const GRAPH: &'static str = DEVICES_GRAPH;

    fn describe(d: &mut DescriptorBuilder<Self>) {
        d.resource_fields();
        d.property("name", "http://www.w3.org/2000/01/rdf-schema#label")
            .label()
            .getter(|m| m.name.clone().map(Value::String))
            .setter(|m, v| m.name = v.and_then(Value::into_string));
        d.property("brand", "http://example.org/vocab#hasBrand")
            .getter(|m| m.brand.clone().map(Value::String))
            .setter(|m, v| m.brand = v.and_then(Value::into_string));
        d.property("removal", "http://example.org/vocab#removalDate")
            .datatype(Datatype::Date)
            .getter(|m| m.removal.map(Value::Date))
            .setter(|m, v| m.removal = v.and_then(|v| v.as_date()));
        d.property("tags", "http://example.org/vocab#hasTag")
            .list_getter(|m| m.tags.iter().cloned().map(Value::String).collect())
            .list_setter(|m, v| m.tags = v.into_iter().filter_map(Value::into_string).collect());
    }

    fn resource(&self) -> &ResourceModel {
        &self.resource
    }

    fn resource_mut(&mut self) -> &mut ResourceModel {
        &mut self.resource
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Area {
    pub resource: ResourceModel,
    pub tree: TreeLink<Area>,
    pub name: Option<String>,
}

impl Area {
    pub fn new(uri: &str) -> Self {
        Self {
            resource: ResourceModel::with_uri(uri),
            ..Default::default()
        }
    }

    pub fn with_parent(uri: &str, parent: Area) -> Self {
        Self {
            resource: ResourceModel::with_uri(uri),
            tree: TreeLink::with_parent(parent),
            name: None,
        }
    }

    pub fn with_parent_uri(uri: &str, parent: &str) -> Self {
        Self {
            resource: ResourceModel::with_uri(uri),
            tree: TreeLink::with_parent_uri(parent),
            name: None,
        }
    }

    pub fn uri(&self) -> &str {
        self.resource.uri().unwrap_or_default()
    }
}

impl SparqlModel for Area {
    const RDF_TYPE: &'static str = AREA;
    const GRAPH: &'static str = AREAS_GRAPH;

    fn describe(d: &mut DescriptorBuilder<Self>) {
        d.resource_fields();
        d.property("name", "http://example.org/vocab#hasName")
            .getter(|m| m.name.clone().map(Value::String))
            .setter(|m, v| m.name = v.and_then(Value::into_string));
        d.property("parent", "http://example.org/vocab#isPartOf")
            .object::<Area>()
            .getter(|m| m.tree.parent_uri().map(|p| Value::Uri(p.to_string())))
            .setter(|m, v| m.tree.parent = v.and_then(Value::into_uri).map(ParentRef::Uri));
    }

    fn resource(&self) -> &ResourceModel {
        &self.resource
    }

    fn resource_mut(&mut self) -> &mut ResourceModel {
        &mut self.resource
    }
}

impl TreeModel for Area {
    fn tree(&self) -> &TreeLink<Self> {
        &self.tree
    }

    fn tree_mut(&mut self) -> &mut TreeLink<Self> {
        &mut self.tree
    }
}

/// Facility hosting devices, with a required main device
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Facility {
    pub resource: ResourceModel,
    pub main_device: Option<String>,
    pub hosts: Vec<String>,
}

impl SparqlModel for Facility {
    const RDF_TYPE: &'static str = FACILITY;
    const GRAPH: &'static str = FACILITIES_GRAPH;

    fn describe(d: &mut DescriptorBuilder<Self>) {
        d.resource_fields();
        d.property("main_device", "http://example.org/vocab#hasMainDevice")
            .object::<Device>()
            .required()
            .getter(|m| m.main_device.clone().map(Value::Uri))
            .setter(|m, v| m.main_device = v.and_then(Value::into_uri));
        d.property("hosts", "http://example.org/vocab#hosts")
            .object::<Device>()
            .list_getter(|m| m.hosts.iter().cloned().map(Value::Uri).collect())
            .list_setter(|m, v| m.hosts = v.into_iter().filter_map(Value::into_uri).collect());
    }

    fn resource(&self) -> &ResourceModel {
        &self.resource
    }

    fn resource_mut(&mut self) -> &mut ResourceModel {
        &mut self.resource
    }
}

/// Store holding `Sensor rdfs:subClassOf Device` and type labels
pub fn store_with_ontology() -> MemoryStore {
    use triplemap::rdf::Literal;

    let ontology = Some(node(ONTOLOGY_GRAPH));
    MemoryStore::from_quads(vec![
        Quad::new(node(SENSOR), node(vocab::RDFS_SUB_CLASS_OF), node(DEVICE), ontology.clone()),
        Quad::new(
            node(DEVICE),
            node(vocab::RDFS_LABEL),
            Literal::new_language_tagged_literal("Device", "en").unwrap(),
            ontology.clone(),
        ),
        Quad::new(
            node(DEVICE),
            node(vocab::RDFS_LABEL),
            Literal::new_language_tagged_literal("Appareil", "fr").unwrap(),
            ontology,
        ),
    ])
    .unwrap()
}
