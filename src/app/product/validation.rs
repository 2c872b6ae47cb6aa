//! 产品字段校验
//!
//! 纯函数：原始记录要么被规范化为 [`NewProduct`]，要么得到按字段顺序排列的错误列表。

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use serde::{Deserialize, Deserializer};
use validator::Validate;

use super::csv_rows::CsvRow;
use super::model::NewProduct;

/// 校验失败时字段的报告顺序
pub const FIELD_ORDER: [&str; 4] = ["name", "price", "description", "image"];

/// 原始产品记录
///
/// JSON 请求直接反序列化为该结构；CSV 行通过 [`ProductInput::from_csv_row`] 转换。
/// 缺失的文本字段按空串处理，从而落入长度校验。
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProductInput {
    #[serde(default)]
    #[validate(length(min = 3, max = 50, message = "name must be between 3 and 50 characters"))]
    pub name: String,

    #[serde(default, deserialize_with = "number_or_none")]
    #[validate(
        required(message = "price must be a number"),
        range(min = 10.0, message = "price must be at least 10.00")
    )]
    pub price: Option<f64>,

    #[serde(default)]
    #[validate(length(
        min = 30,
        max = 255,
        message = "description must be between 30 and 255 characters"
    ))]
    pub description: String,

    #[serde(default)]
    pub image: Option<String>,
}

/// JSON 中只有数值才算价格，字符串等其它类型视为缺失
fn number_or_none<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()))
}

/// 把 CSV 文本解析为价格，非有限值视为无效
fn parse_price(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|p| p.is_finite())
}

impl ProductInput {
    pub fn from_csv_row(row: &CsvRow) -> Self {
        Self {
            name: row.get("name").unwrap_or_default().to_string(),
            price: row.get("price").and_then(parse_price),
            description: row.get("description").unwrap_or_default().to_string(),
            image: row.get("image").map(str::to_string),
        }
    }
}

/// 单个字段的约束违反
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

/// 校验并规范化一条记录
pub fn validate_product(input: ProductInput) -> Result<NewProduct, Vec<FieldViolation>> {
    if let Err(errors) = input.validate() {
        let field_errors = errors.field_errors();
        let violations: Vec<FieldViolation> = FIELD_ORDER
            .iter()
            .filter_map(|field| field_errors.get(*field).map(|errs| (*field, errs)))
            .flat_map(|(field, errs)| {
                errs.iter().map(move |error| FieldViolation {
                    field,
                    message: error
                        .message
                        .as_ref()
                        .map(|msg| msg.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field)),
                })
            })
            .collect();

        if !violations.is_empty() {
            return Err(violations);
        }
    }

    let price = match input.price {
        Some(price) => price,
        None => {
            return Err(vec![FieldViolation {
                field: "price",
                message: "price must be a number".to_string(),
            }])
        }
    };

    Ok(NewProduct {
        name: input.name,
        price,
        description: input.description,
        image: input.image.filter(|image| !image.is_empty()),
    })
}

const IMAGE_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// 计算 base64 图片解码后的字节数，允许 `data:<mime>;base64,` 前缀
pub fn decoded_image_len(image: &str) -> Result<usize, FieldViolation> {
    let payload = match image.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(rest),
        None => image,
    };
    let payload: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    IMAGE_ENGINE
        .decode(payload.as_bytes())
        .map(|bytes| bytes.len())
        .map_err(|_| FieldViolation {
            field: "image",
            message: "image must be valid base64".to_string(),
        })
}

/// 单条创建路径的图片大小上限检查
pub fn check_image_size(image: &str, max_bytes: usize) -> Result<(), FieldViolation> {
    let len = decoded_image_len(image)?;
    if len > max_bytes {
        return Err(FieldViolation {
            field: "image",
            message: format!("image must not exceed {}MB", max_bytes / (1024 * 1024)),
        });
    }
    Ok(())
}
