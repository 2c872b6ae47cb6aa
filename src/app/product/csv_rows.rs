//! CSV 行解码
//!
//! 第一行是表头，之后每一行解码为 `表头 -> 文本` 的映射。迭代器是惰性的、
//! 只能遍历一次；遇到格式错误的行时返回 [`DecodeError`] 并结束。

use std::collections::HashMap;

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};

/// 导入文件必须包含的列
pub const REQUIRED_COLUMNS: [&str; 3] = ["name", "price", "description"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("CSV file is empty: missing header line")]
    MissingHeader,
    #[error("CSV header is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<&'static str>),
    #[error("malformed CSV on line {line}: {message}")]
    Malformed { line: usize, message: String },
}

/// 一行数据；`line` 从表头所在的第 1 行开始计数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    pub line: usize,
    pub fields: HashMap<String, String>,
}

impl CsvRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }
}

/// 表头规范化：去空白、转小写，并兼容旧版的葡萄牙语列名
fn canonical_header(raw: &str) -> String {
    let header = raw.trim_start_matches('\u{feff}').trim().to_lowercase();
    let alias = match header.as_str() {
        "nome" => Some("name"),
        "preco" | "preço" => Some("price"),
        "descricao" | "descrição" => Some("description"),
        "imagem" => Some("image"),
        _ => None,
    };
    alias.map(str::to_string).unwrap_or(header)
}

pub struct CsvRows<'a> {
    records: StringRecordsIntoIter<&'a [u8]>,
    headers: Vec<String>,
    line: usize,
    done: bool,
}

/// 读取表头并返回数据行迭代器
pub fn decode_rows(bytes: &[u8]) -> Result<CsvRows<'_>, DecodeError> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(bytes);

    let header_record = reader.headers().map_err(|e| DecodeError::Malformed {
        line: 1,
        message: e.to_string(),
    })?;

    if header_record.iter().all(|h| h.trim().is_empty()) {
        return Err(DecodeError::MissingHeader);
    }

    let headers: Vec<String> = header_record.iter().map(canonical_header).collect();

    let missing: Vec<&'static str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == column))
        .collect();
    if !missing.is_empty() {
        return Err(DecodeError::MissingColumns(missing));
    }

    Ok(CsvRows {
        records: reader.into_records(),
        headers,
        line: 1,
        done: false,
    })
}

impl CsvRows<'_> {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    fn to_row(&self, record: &StringRecord) -> CsvRow {
        let fields = self
            .headers
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect();
        CsvRow {
            line: self.line,
            fields,
        }
    }
}

impl Iterator for CsvRows<'_> {
    type Item = Result<CsvRow, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let record = match self.records.next() {
            Some(record) => record,
            None => {
                self.done = true;
                return None;
            }
        };
        self.line += 1;

        match record {
            Ok(record) => Some(Ok(self.to_row(&record))),
            Err(e) => {
                self.done = true;
                Some(Err(DecodeError::Malformed {
                    line: self.line,
                    message: e.to_string(),
                }))
            }
        }
    }
}
