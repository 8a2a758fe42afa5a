use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::Serialize;

const TAGS: [&str; 7] = [
    "MsgType",
    "FromUserName",
    "CreateTime",
    "Content",
    "MediaId",
    "Emoji",
    "PicUrl",
];

/// Raw tag bodies from one inbound payload. `None` means the tag was absent,
/// `Some("")` that it was present but empty.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InboundFields {
    pub msg_type: Option<String>,
    pub from_user: Option<String>,
    pub create_time: Option<String>,
    pub content: Option<String>,
    pub media_id: Option<String>,
    pub emoji: Option<String>,
    pub pic_url: Option<String>,
}

impl InboundFields {
    fn slot(&mut self, tag: &str) -> Option<&mut Option<String>> {
        match tag {
            "MsgType" => Some(&mut self.msg_type),
            "FromUserName" => Some(&mut self.from_user),
            "CreateTime" => Some(&mut self.create_time),
            "Content" => Some(&mut self.content),
            "MediaId" => Some(&mut self.media_id),
            "Emoji" => Some(&mut self.emoji),
            "PicUrl" => Some(&mut self.pic_url),
            _ => None,
        }
    }

    fn record(&mut self, tag: &str, body: String) {
        if let Some(slot) = self.slot(tag) {
            if slot.is_none() {
                *slot = Some(body);
            }
        }
    }
}

/// Extracts the first occurrence of each known tag, unwrapping CDATA sections.
///
/// Parsing stops quietly at the first syntax error; fields read up to that
/// point are kept.
pub fn parse_inbound(xml: &str) -> InboundFields {
    let mut reader = Reader::from_str(xml);
    let mut fields = InboundFields::default();
    let mut capturing: Option<(&'static str, String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                if capturing.is_none() {
                    let name = start.name();
                    capturing = TAGS
                        .iter()
                        .find(|tag| tag.as_bytes() == name.as_ref())
                        .map(|tag| (*tag, String::new()));
                }
            }
            Ok(Event::Empty(empty)) => {
                if capturing.is_none() {
                    let name = empty.name();
                    if let Some(tag) = TAGS.iter().find(|tag| tag.as_bytes() == name.as_ref()) {
                        fields.record(tag, String::new());
                    }
                }
            }
            Ok(Event::Text(text)) => {
                if let Some((_, body)) = capturing.as_mut() {
                    match text.unescape() {
                        Ok(unescaped) => body.push_str(&unescaped),
                        Err(_) => body.push_str(&String::from_utf8_lossy(&text)),
                    }
                }
            }
            Ok(Event::CData(cdata)) => {
                if let Some((_, body)) = capturing.as_mut() {
                    body.push_str(&String::from_utf8_lossy(&cdata));
                }
            }
            Ok(Event::End(end)) => {
                let closes_capture = matches!(&capturing, Some((tag, _)) if tag.as_bytes() == end.name().as_ref());
                if closes_capture {
                    if let Some((tag, body)) = capturing.take() {
                        fields.record(tag, body);
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            Ok(_) => {}
        }
    }

    fields
}

/// Flat record forwarded downstream for every inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncomingMessage {
    pub timestamp: String,
    pub openid: String,
    #[serde(rename = "type")]
    pub msg_type: String,
    pub content: String,
    #[serde(rename = "mediaId")]
    pub media_id: String,
    #[serde(rename = "picUrl", skip_serializing_if = "Option::is_none")]
    pub pic_url: Option<String>,
}

impl From<InboundFields> for IncomingMessage {
    fn from(fields: InboundFields) -> Self {
        let msg_type = fields.msg_type.unwrap_or_default();
        let content = match msg_type.as_str() {
            "text" => fields.content.unwrap_or_default(),
            "image" => "[图片]".to_string(),
            "voice" => "[语音]".to_string(),
            "video" => "[视频]".to_string(),
            "emoji" => fields
                .emoji
                .filter(|emoji| !emoji.is_empty())
                .unwrap_or_else(|| "[表情]".to_string()),
            "" => "[unknown]".to_string(),
            other => format!("[{}]", other),
        };

        IncomingMessage {
            timestamp: fields.create_time.unwrap_or_default(),
            openid: fields.from_user.unwrap_or_default(),
            msg_type,
            content,
            media_id: fields.media_id.unwrap_or_default(),
            pic_url: fields.pic_url,
        }
    }
}

impl IncomingMessage {
    pub fn parse(xml: &str) -> Self {
        parse_inbound(xml).into()
    }
}
