use crate::octree::{OctreeNodeRecord, PathCode};
use crate::resource::file::OctreeLayout;
use serde::Serialize;
use std::io::Write;
use thiserror::Error;

pub const DEFAULT_COMMIT_INTERVAL: usize = 1000;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Receives the records of a walk, in walk order.
pub trait RecordSink {
    fn accept(&mut self, record: OctreeNodeRecord) -> Result<(), SinkError>;

    /// Called once after the last record of a successful walk.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl RecordSink for Vec<OctreeNodeRecord> {
    fn accept(&mut self, record: OctreeNodeRecord) -> Result<(), SinkError> {
        self.push(record);
        Ok(())
    }
}

/// Flat form of a record, as persisted.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordRow<'a> {
    pub path: &'a str,
    pub level: u32,
    pub number_points: u32,
    pub min_z: f64,
    pub max_z: f64,
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl<'a> From<&'a OctreeNodeRecord> for RecordRow<'a> {
    fn from(record: &'a OctreeNodeRecord) -> Self {
        let (min, max) = record.footprint();
        Self {
            path: record.path.as_str(),
            level: record.level,
            number_points: record.num_points,
            min_z: record.min_z(),
            max_z: record.max_z(),
            min_x: min.x,
            min_y: min.y,
            max_x: max.x,
            max_y: max.y,
        }
    }
}

/// Writes one JSON object per line.
pub struct NdjsonSink<W: Write> {
    out: W,
}

impl<W: Write> NdjsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RecordSink for NdjsonSink<W> {
    fn accept(&mut self, record: OctreeNodeRecord) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.out, &RecordRow::from(&record))?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(self.out.flush()?)
    }
}

/// Writes a PostGIS script creating, filling and indexing the extent table.
///
/// Inserts are grouped in transactions of `commit_interval` rows.
pub struct SqlScriptSink<W: Write> {
    out: W,
    table: String,
    srid: i32,
    commit_interval: usize,
    layout: Option<OctreeLayout>,
    started: bool,
    pending: usize,
}

impl<W: Write> SqlScriptSink<W> {
    pub fn new(out: W, table: impl Into<String>, srid: i32) -> Self {
        Self {
            out,
            table: table.into(),
            srid,
            commit_interval: DEFAULT_COMMIT_INTERVAL,
            layout: None,
            started: false,
            pending: 0,
        }
    }

    pub fn commit_interval(mut self, commit_interval: usize) -> Self {
        self.commit_interval = commit_interval.max(1);
        self
    }

    /// Store payload file paths instead of path codes in the `filepath` column.
    pub fn with_layout(mut self, layout: OctreeLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn file_path(&self, path: &PathCode) -> String {
        match &self.layout {
            Some(layout) => layout.payload_file(path).display().to_string(),
            None => path.to_string(),
        }
    }

    fn start(&mut self) -> Result<(), SinkError> {
        if self.started {
            return Ok(());
        }
        writeln!(
            self.out,
            "CREATE TABLE {} (filepath text, level integer, numberpoints bigint, minz double precision, maxz double precision, geom public.geometry(Geometry, {}));",
            self.table, self.srid
        )?;
        writeln!(self.out, "BEGIN;")?;
        self.started = true;
        Ok(())
    }
}

impl<W: Write> RecordSink for SqlScriptSink<W> {
    fn accept(&mut self, record: OctreeNodeRecord) -> Result<(), SinkError> {
        self.start()?;

        let row = RecordRow::from(&record);
        let file_path = self.file_path(&record.path).replace('\'', "''");
        writeln!(
            self.out,
            "INSERT INTO {} (filepath,level,numberpoints,minz,maxz,geom) VALUES ('{}', {}, {}, {}, {}, ST_MakeEnvelope({}, {}, {}, {}, {}));",
            self.table,
            file_path,
            row.level,
            row.number_points,
            row.min_z,
            row.max_z,
            row.min_x,
            row.min_y,
            row.max_x,
            row.max_y,
            self.srid
        )?;

        self.pending += 1;
        if self.pending == self.commit_interval {
            writeln!(self.out, "COMMIT;")?;
            writeln!(self.out, "BEGIN;")?;
            self.pending = 0;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.start()?;
        writeln!(self.out, "COMMIT;")?;
        writeln!(
            self.out,
            "CREATE INDEX {0}_geom ON {0} USING GIST ( geom );",
            self.table
        )?;
        writeln!(self.out, "CREATE INDEX {0}_level ON {0} (level);", self.table)?;
        self.out.flush()?;
        Ok(())
    }
}
