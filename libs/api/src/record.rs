/// Одна запись line protocol: непрозрачные байты вместе с терминатором.
///
/// Writer никогда не разбирает синтаксис записи: валидация это забота
/// удалённого store. Байты передаются без изменений.
#[derive(Clone, PartialEq, Eq)]
pub struct Record {
    bytes: Vec<u8>,
}

impl Record {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Length in bytes, terminator included.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Record({:?})", String::from_utf8_lossy(&self.bytes))
    }
}

impl From<&str> for Record {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Record {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

/// Упорядоченная группа записей, отправляемая одним запросом на запись.
///
/// Создаётся аккумулятором и потребляется транспортом ровно один раз;
/// после передачи транспорту не изменяется.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    records: Vec<Record>,
    bytes: usize,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(records: usize) -> Self {
        Self { records: Vec::with_capacity(records), bytes: 0 }
    }

    pub fn push(&mut self, record: Record) {
        self.bytes += record.len();
        self.records.push(record);
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total payload size in bytes.
    pub fn size(&self) -> usize {
        self.bytes
    }

    /// Request body: records concatenated with their original terminators.
    pub fn body(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(self.bytes);
        for record in &self.records {
            body.extend_from_slice(record.as_bytes());
        }
        body
    }
}

impl FromIterator<Record> for Batch {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut batch = Batch::new();
        for record in iter {
            batch.push(record);
        }
        batch
    }
}
