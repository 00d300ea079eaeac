use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;
use xz::bufread::XzDecoder;

use osm_mapdata::data::bounds::BoundingBox;
use osm_mapdata::data::osm::{Node, Relation, Way};
use osm_mapdata::data::MapDataSet;
use osm_mapdata::decode::{
    decode_diff, decode_map_data, decode_map_data_changes, ChangeGroup, DiffRecord, ListHandler,
    MapDataChangesHandler, MapDataHandler,
};
use osm_mapdata::Result;

use super::Etl;
use crate::{DocumentKind, UserConfig};

pub const ETL_NAME: &str = "parse_osm";
pub const OUTPUT_FILE_NAME: &str = "decode_summary.json";

/// Map data decoded from a change document, counted per group.
#[derive(Default)]
pub struct ChangeCollector {
    current: Option<ChangeGroup>,
    data: MapDataSet,
    created: usize,
    modified: usize,
    deleted: usize,
}

impl ChangeCollector {
    fn count(&mut self) {
        match self.current {
            Some(ChangeGroup::Created) => self.created += 1,
            Some(ChangeGroup::Modified) => self.modified += 1,
            Some(ChangeGroup::Deleted) => self.deleted += 1,
            None => (),
        }
    }
}

impl MapDataHandler for ChangeCollector {
    fn handle_bounds(&mut self, bounds: BoundingBox) -> Result<()> {
        self.data.handle_bounds(bounds)
    }

    fn handle_node(&mut self, node: Node) -> Result<()> {
        self.count();
        self.data.handle_node(node)
    }

    fn handle_way(&mut self, way: Way) -> Result<()> {
        self.count();
        self.data.handle_way(way)
    }

    fn handle_relation(&mut self, relation: Relation) -> Result<()> {
        self.count();
        self.data.handle_relation(relation)
    }
}

impl MapDataChangesHandler for ChangeCollector {
    fn handle_change_group(&mut self, group: ChangeGroup) -> Result<()> {
        self.current = Some(group);
        Ok(())
    }
}

pub enum Output {
    MapData(MapDataSet),
    Changes(ChangeCollector),
    Diff(Vec<DiffRecord>),
}

#[derive(Serialize, Debug, Default, PartialEq)]
pub struct ChangeCounts {
    pub created: usize,
    pub modified: usize,
    pub deleted: usize,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct DecodeSummary {
    pub document: DocumentKind,
    /// `[min_lat, min_lon, max_lat, max_lon]`
    pub bounds: Option<[f64; 4]>,
    pub nodes: usize,
    pub ways: usize,
    pub closed_ways: usize,
    pub relations: usize,
    pub changes: Option<ChangeCounts>,
    pub diff: Vec<DiffRecord>,
}

impl DecodeSummary {
    fn empty(document: DocumentKind) -> Self {
        DecodeSummary {
            document,
            bounds: None,
            nodes: 0,
            ways: 0,
            closed_ways: 0,
            relations: 0,
            changes: None,
            diff: Vec::new(),
        }
    }

    fn with_map_data(mut self, data: &MapDataSet) -> Self {
        self.bounds = data.bounds.map(|b| {
            [
                b.min_latitude(),
                b.min_longitude(),
                b.max_latitude(),
                b.max_longitude(),
            ]
        });
        self.nodes = data.nodes.len();
        self.ways = data.ways.len();
        self.closed_ways = data.ways.values().filter(|way| way.is_closed()).count();
        self.relations = data.relations.len();
        self
    }
}

impl From<Output> for DecodeSummary {
    fn from(output: Output) -> Self {
        match output {
            Output::MapData(data) => DecodeSummary::empty(DocumentKind::Map).with_map_data(&data),
            Output::Changes(changes) => {
                let mut summary =
                    DecodeSummary::empty(DocumentKind::Changes).with_map_data(&changes.data);
                summary.changes = Some(ChangeCounts {
                    created: changes.created,
                    modified: changes.modified,
                    deleted: changes.deleted,
                });
                summary
            }
            Output::Diff(records) => DecodeSummary {
                diff: records,
                ..DecodeSummary::empty(DocumentKind::Diff)
            },
        }
    }
}

pub struct ParseOsmEtl<'a> {
    config: &'a UserConfig,
}

impl ParseOsmEtl<'_> {
    pub fn new(config: &UserConfig) -> ParseOsmEtl {
        ParseOsmEtl { config }
    }

    fn output_path(dir: &Path) -> PathBuf {
        dir.join(OUTPUT_FILE_NAME)
    }

    /// Opens the input, decompressing `.xz` files on the fly.
    fn create_osm_reader(&self) -> Result<Box<dyn BufRead>> {
        let path = Path::new(&self.config.data_path);
        let file_reader = BufReader::new(File::open(path)?);
        if path.extension().is_some_and(|ext| ext == "xz") {
            let xz_reader = XzDecoder::new(file_reader);
            Ok(Box::new(BufReader::new(xz_reader)))
        } else {
            Ok(Box::new(file_reader))
        }
    }
}

impl Etl for ParseOsmEtl<'_> {
    type Input = Box<dyn BufRead>;
    type Output = Output;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn is_cached(&self, dir: &Path) -> Result<bool> {
        Ok(Self::output_path(dir).try_exists()?)
    }

    fn clean(&self, dir: &Path) -> Result<()> {
        if self.is_cached(dir)? {
            fs::remove_file(Self::output_path(dir))?;
        }
        Ok(())
    }

    fn extract(&mut self, _dir: &Path) -> Result<Self::Input> {
        self.create_osm_reader()
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        let output = match self.config.document {
            DocumentKind::Map => {
                let mut data = MapDataSet::new();
                decode_map_data(input, &mut data)?;
                info!(etl_name = ETL_NAME, entities = data.len(); "Decoded map data");
                Output::MapData(data)
            }
            DocumentKind::Changes => {
                let mut changes = ChangeCollector::default();
                decode_map_data_changes(input, &mut changes)?;
                info!(
                    etl_name = ETL_NAME,
                    created = changes.created,
                    modified = changes.modified,
                    deleted = changes.deleted;
                    "Decoded change document"
                );
                Output::Changes(changes)
            }
            DocumentKind::Diff => {
                let mut records = ListHandler::new();
                decode_diff(input, &mut records)?;
                info!(etl_name = ETL_NAME, records = records.get().len(); "Decoded diff result");
                Output::Diff(records.into_inner())
            }
        };
        Ok(output)
    }

    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()> {
        let output_file = BufWriter::new(File::create(Self::output_path(dir))?);
        serde_json::to_writer_pretty(output_file, &DecodeSummary::from(output))?;
        Ok(())
    }
}
