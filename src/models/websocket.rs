use serde::{ Serialize, Deserialize };
use super::chat::ChatMessage;
use super::product::{ Product, ProductId };

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "filter")] Filter {
        category: Option<String>,
    },
    #[serde(rename = "toggle")] Toggle {
        id: ProductId,
    },
    #[serde(rename = "remove")] Remove {
        id: ProductId,
    },
    #[serde(rename = "clear")]
    Clear,
    #[serde(rename = "chat")] Chat {
        content: String,
    },
    #[serde(rename = "generate_routine")]
    GenerateRoutine,
    #[serde(rename = "history")]
    History,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "products")] Products {
        products: Vec<Product>,
    },
    #[serde(rename = "selection")] Selection {
        products: Vec<Product>,
    },
    #[serde(rename = "history")] History {
        messages: Vec<ChatMessage>,
    },
    #[serde(rename = "processing")]
    Processing,
    #[serde(rename = "response")] Response {
        content: String,
        timestamp: i64,
    },
    #[serde(rename = "notice")] Notice {
        message: String,
    },
    #[serde(rename = "error")] Error {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_client_events() {
        let toggle: ClientMessage = serde_json::from_str(r#"{"type":"toggle","id":7}"#).unwrap();
        assert!(matches!(toggle, ClientMessage::Toggle { id: 7 }));

        let routine: ClientMessage = serde_json::from_str(r#"{"type":"generate_routine"}"#).unwrap();
        assert!(matches!(routine, ClientMessage::GenerateRoutine));

        let all: ClientMessage = serde_json::from_str(r#"{"type":"filter","category":null}"#).unwrap();
        assert!(matches!(all, ClientMessage::Filter { category: None }));
    }
}
