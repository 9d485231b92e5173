use dolphin_vals::{Constant, Table};

#[derive(Clone, Debug)]
pub enum MessageBody {
    /// One row: a value per column, in column order.
    Row { names: Vec<String>, values: Vec<Constant> },
    /// Every row of one frame.
    Table(Table),
}

#[derive(Clone, Debug)]
pub struct Message {
    pub topic: String,
    /// Offset of the (first) row in the stream table.
    pub offset: i64,
    pub body: MessageBody,
}

impl Message {
    pub fn rows(&self) -> usize {
        match &self.body {
            MessageBody::Row { .. } => 1,
            MessageBody::Table(t) => t.rows(),
        }
    }

    /// Offset of the last row carried.
    pub fn last_offset(&self) -> i64 {
        self.offset + self.rows().max(1) as i64 - 1
    }

    pub fn values(&self) -> Option<&[Constant]> {
        match &self.body {
            MessageBody::Row { values, .. } => Some(values),
            MessageBody::Table(_) => None,
        }
    }

    pub fn table(&self) -> Option<&Table> {
        match &self.body {
            MessageBody::Table(t) => Some(t),
            MessageBody::Row { .. } => None,
        }
    }

    /// A row value by column name, ignoring case.
    pub fn get(&self, column: &str) -> Option<&Constant> {
        match &self.body {
            MessageBody::Row { names, values } => names
                .iter()
                .position(|n| n.eq_ignore_ascii_case(column))
                .and_then(|i| values.get(i)),
            MessageBody::Table(_) => None,
        }
    }
}
