// Stream frames as pushed by a publisher:
//
//   u8 little-endian flag, i64 send time, i64 offset, topics (comma
//   separated, NUL-terminated), then one object
//
// The object is either a table or an ANY vector holding one vector per
// column. A table with no rows carries the schema and no messages.
// `offset` is that of the first row in the frame.

use crate::message::{Message, MessageBody};
use dolphin_base::{malformed_err, Result};
use dolphin_vals::{Constant, Table, Vector, VectorOps};
use dolphin_wire::{ConstantReader, ConstantWriter, DataInputStream, DataOutputStream};
use rapidhash::RapidHashMap;
use std::io::{Read, Write};
use tracing::{debug, trace};

#[derive(Clone, Debug)]
pub struct Frame {
    pub sent_time: i64,
    pub offset: i64,
    pub topics: Vec<String>,
    pub body: Constant,
}

pub fn write_frame<W: Write>(out: &mut DataOutputStream<W>, writer: &mut ConstantWriter, frame: &Frame) -> Result<()> {
    out.write_u8(u8::from(!out.is_reversed()));
    out.write_i64(frame.sent_time);
    out.write_i64(frame.offset);
    out.write_string(frame.topics.join(",").as_bytes());
    writer.write(out, &frame.body)?;
    out.flush()
}

pub fn read_frame<R: Read>(inp: &mut DataInputStream<R>, reader: &mut ConstantReader) -> Result<Frame> {
    let little_endian = inp.read_u8()? != 0;
    inp.set_reversed(!little_endian);
    let sent_time = inp.read_i64()?;
    let offset = inp.read_i64()?;
    let topics = inp
        .read_string()?
        .split(',')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect();
    let body = reader.read(inp)?;
    Ok(Frame {
        sent_time,
        offset,
        topics,
        body,
    })
}

/// Turns frames into messages, remembering each topic's column names from
/// its schema frame.
#[derive(Default)]
pub struct FrameDecoder {
    schemas: RapidHashMap<String, Vec<String>>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema(&self, topic: &str) -> Option<&[String]> {
        self.schemas.get(topic).map(|s| s.as_slice())
    }

    fn names_for(&self, topic: &str, cols: usize) -> Vec<String> {
        match self.schemas.get(topic) {
            Some(names) if names.len() == cols => names.clone(),
            _ => (0..cols).map(|i| format!("col{}", i)).collect(),
        }
    }

    pub fn split(&mut self, frame: Frame, as_table: bool) -> Result<Vec<Message>> {
        let (names, columns) = match frame.body {
            Constant::Table(t) if t.rows() == 0 => {
                for topic in &frame.topics {
                    debug!(target: "dolphin", %topic, cols = t.cols(), "schema frame");
                    self.schemas.insert(topic.clone(), t.column_names().to_vec());
                }
                return Ok(Vec::new());
            }
            Constant::Table(t) => (Some(t.column_names().to_vec()), t.into_columns()),
            Constant::Vector(Vector::Any(cols)) => {
                let mut columns = Vec::with_capacity(cols.len());
                for c in cols.elems() {
                    match c {
                        Constant::Vector(v) => columns.push(v.clone()),
                        other => {
                            return Err(malformed_err(format!(
                                "stream column is a {:?}, not a vector",
                                other.form()
                            )))
                        }
                    }
                }
                (None, columns)
            }
            other => {
                return Err(malformed_err(format!(
                    "stream frame body is a {:?}",
                    other.form()
                )))
            }
        };
        let rows = columns.first().map_or(0, |c| c.len());
        if columns.iter().any(|c| c.len() != rows) {
            return Err(malformed_err("stream frame columns differ in length"));
        }
        let mut out = Vec::new();
        for topic in &frame.topics {
            let names = names.clone().unwrap_or_else(|| self.names_for(topic, columns.len()));
            if as_table {
                let t = Table::new(names, columns.clone())?;
                out.push(Message {
                    topic: topic.clone(),
                    offset: frame.offset,
                    body: MessageBody::Table(t),
                });
                continue;
            }
            for r in 0..rows {
                let row = columns.iter().map(|c| c.get_constant(r)).collect::<Result<Vec<_>>>()?;
                out.push(Message {
                    topic: topic.clone(),
                    offset: frame.offset + r as i64,
                    body: MessageBody::Row { names: names.clone(), values: row },
                });
            }
        }
        trace!(target: "dolphin", rows, topics = frame.topics.len(), "frame split");
        Ok(out)
    }
}
