// The API request/response framing.
//
// A request is a text line `API <session> <len>`, then `len` bytes of text
// body whose first line names the request kind, then any argument objects:
//
//   connect
//   script\n<text>
//   function\n<name>\n<nargs>\n1          + nargs objects
//   variable\n<name,name,...>\n<n>\n1      + n objects
//
// The trailing `1` says the objects are little-endian. A response is a
// line `<session> <nobj> <little-endian flag>`, a line that is `OK` or the
// server's error text, then `nobj` objects.

use dolphin_base::{err, malformed_err, Result};
use dolphin_vals::Constant;
use dolphin_wire::{ConstantReader, ConstantWriter, DataInputStream, DataOutputStream};
use std::io::{Read, Write};

/// Most objects one request or response may carry.
pub const MAX_OBJECTS: usize = 65535;

/// Longest request body text, in bytes.
pub const MAX_BODY_LEN: usize = 64 << 20;

#[derive(Clone, Debug)]
pub enum Request {
    Connect,
    Script(String),
    Function { name: String, args: Vec<Constant> },
    Variables { names: Vec<String>, values: Vec<Constant> },
}

impl Request {
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Connect => "connect",
            Request::Script(_) => "script",
            Request::Function { .. } => "function",
            Request::Variables { .. } => "variable",
        }
    }
}

fn write_frame<W: Write>(
    out: &mut DataOutputStream<W>,
    writer: &mut ConstantWriter,
    session: &str,
    body: &str,
    objects: &[Constant],
) -> Result<()> {
    out.write_bytes(format!("API {} {}\n", session, body.len()).as_bytes());
    out.write_bytes(body.as_bytes());
    for obj in objects {
        writer.write(out, obj)?;
    }
    out.flush()
}

pub fn write_connect<W: Write>(out: &mut DataOutputStream<W>, writer: &mut ConstantWriter) -> Result<()> {
    write_frame(out, writer, "0", "connect\n", &[])
}

pub fn write_script<W: Write>(
    out: &mut DataOutputStream<W>,
    writer: &mut ConstantWriter,
    session: &str,
    script: &str,
) -> Result<()> {
    write_frame(out, writer, session, &format!("script\n{}", script), &[])
}

pub fn write_function<W: Write>(
    out: &mut DataOutputStream<W>,
    writer: &mut ConstantWriter,
    session: &str,
    name: &str,
    args: &[Constant],
) -> Result<()> {
    let body = format!("function\n{}\n{}\n1", name, args.len());
    write_frame(out, writer, session, &body, args)
}

pub fn write_variables<W: Write>(
    out: &mut DataOutputStream<W>,
    writer: &mut ConstantWriter,
    session: &str,
    names: &[String],
    values: &[Constant],
) -> Result<()> {
    if names.len() != values.len() {
        return Err(malformed_err(format!(
            "{} variable names for {} values",
            names.len(),
            values.len()
        )));
    }
    let body = format!("variable\n{}\n{}\n1", names.join(","), values.len());
    write_frame(out, writer, session, &body, values)
}

fn read_objects<R: Read>(inp: &mut DataInputStream<R>, reader: &mut ConstantReader, n: usize) -> Result<Vec<Constant>> {
    let mut out = Vec::with_capacity(n.min(16));
    for _ in 0..n {
        out.push(reader.read(inp)?);
    }
    Ok(out)
}

fn parse_count(s: Option<&str>, what: &str, max: usize) -> Result<usize> {
    let n = s
        .and_then(|s| s.trim().parse::<usize>().ok())
        .ok_or_else(|| malformed_err(format!("bad {} in frame", what)))?;
    if n > max {
        return Err(malformed_err(format!("{} {} exceeds {}", what, n, max)));
    }
    Ok(n)
}

/// Server side of [`write_script`] and friends. Returns the session named
/// in the request line and the decoded request.
pub fn read_request<R: Read>(inp: &mut DataInputStream<R>, reader: &mut ConstantReader) -> Result<(String, Request)> {
    let line = inp.read_line()?;
    let mut parts = line.split(' ');
    if parts.next() != Some("API") {
        return Err(malformed_err(format!("bad request line '{}'", line)));
    }
    let session = parts.next().unwrap_or("0").to_string();
    let len = parse_count(parts.next(), "body length", MAX_BODY_LEN)?;
    let body = String::from_utf8(inp.read_bytes(len)?).map_err(|e| malformed_err(format!("request body: {}", e)))?;
    let mut lines = body.splitn(2, '\n');
    let kind = lines.next().unwrap_or("");
    let rest = lines.next().unwrap_or("");
    let req = match kind {
        "connect" => Request::Connect,
        "script" => Request::Script(rest.to_string()),
        "function" => {
            let mut f = rest.split('\n');
            let name = f.next().unwrap_or("").to_string();
            let n = parse_count(f.next(), "argument count", MAX_OBJECTS)?;
            Request::Function {
                name,
                args: read_objects(inp, reader, n)?,
            }
        }
        "variable" => {
            let mut f = rest.split('\n');
            let names: Vec<String> = f
                .next()
                .unwrap_or("")
                .split(',')
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect();
            let n = parse_count(f.next(), "variable count", MAX_OBJECTS)?;
            if n != names.len() {
                return Err(malformed_err(format!("{} variable names for {} values", names.len(), n)));
            }
            Request::Variables {
                names,
                values: read_objects(inp, reader, n)?,
            }
        }
        other => return Err(malformed_err(format!("unknown request kind '{}'", other))),
    };
    Ok((session, req))
}

/// Writes a reply: a result (maybe none) or the server's error text.
pub fn write_response<W: Write>(
    out: &mut DataOutputStream<W>,
    writer: &mut ConstantWriter,
    session: &str,
    reply: std::result::Result<Option<&Constant>, &str>,
) -> Result<()> {
    match reply {
        Ok(obj) => {
            let n = obj.map_or(0, |_| 1);
            out.write_bytes(format!("{} {} 1\nOK\n", session, n).as_bytes());
            if let Some(obj) = obj {
                writer.write(out, obj)?;
            }
        }
        Err(msg) => {
            let msg = msg.replace('\n', " ");
            out.write_bytes(format!("{} 0 1\n{}\n", session, msg).as_bytes());
        }
    }
    out.flush()
}

/// Client side of a reply. A server-reported failure becomes an error with
/// the server's text.
pub fn read_response<R: Read>(
    inp: &mut DataInputStream<R>,
    reader: &mut ConstantReader,
) -> Result<(String, Option<Constant>)> {
    let line = inp.read_line()?;
    let mut parts = line.split(' ');
    let session = parts.next().unwrap_or("").to_string();
    let n = parse_count(parts.next(), "object count", MAX_OBJECTS)?;
    let little_endian = parts.next().map(|s| s.trim() == "1").unwrap_or(true);
    let status = inp.read_line()?;
    if status != "OK" {
        return Err(err(format!("server error: {}", status)));
    }
    inp.set_reversed(!little_endian);
    let mut objs = read_objects(inp, reader, n)?;
    Ok((session, objs.pop()))
}
