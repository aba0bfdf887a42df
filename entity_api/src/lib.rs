use chrono::Utc;
use log::*;
use sea_orm::DatabaseConnection;

pub use entity::{
    collections, group_type, groups, localised_text, mapping, section, segment_type, segments,
    table_of_content_type, table_of_contents, terms, text_type, texts, Id,
};

pub mod collection;
pub mod error;
pub mod group;
pub mod segment;
pub mod table_of_content;
pub mod term;
pub mod text;

/// Batch id queries are split into `IN (...)` lists of this many ids.
pub const EXISTENCE_CHUNK_SIZE: usize = 100;

pub fn uuid_parse_str(uuid_str: &str) -> Result<Id, error::Error> {
    Id::parse_str(uuid_str.trim()).map_err(|_| error::Error {
        source: None,
        error_kind: error::EntityApiErrorKind::InvalidQueryTerm,
    })
}

/// Seeds a small corpus: a Tibetan root text with an English version, a commentary
/// on it, their tables of contents and the mappings between them.
pub async fn seed_database(db: &DatabaseConnection) -> Result<(), error::Error> {
    use entity::mapping::{Mapping, Mappings};
    use entity::section::{Section, Sections, TextSegment};

    let now = Utc::now();

    let term = term::create(
        db,
        terms::Model {
            id: Id::new_v4(),
            slug: "madhyamaka".to_owned(),
            titles: localised_text::LocalisedText::new()
                .with("bo", "དབུ་མ།")
                .with("en", "Madhyamaka"),
            descriptions: localised_text::LocalisedText::new(),
            parent_id: None,
            has_child: false,
            created_at: now.into(),
            updated_at: now.into(),
        },
    )
    .await?;

    let root_group = group::create(
        db,
        groups::Model {
            id: Id::new_v4(),
            group_type: group_type::GroupType::Text,
            created_at: now.into(),
            updated_at: now.into(),
        },
    )
    .await?;

    let commentary_group = group::create(
        db,
        groups::Model {
            id: Id::new_v4(),
            group_type: group_type::GroupType::Commentary,
            created_at: now.into(),
            updated_at: now.into(),
        },
    )
    .await?;

    let new_text = |title: &str,
                    language: &str,
                    group_id: Id,
                    kind: text_type::TextType,
                    parent_id: Option<Id>| texts::Model {
        id: Id::new_v4(),
        pecha_text_id: None,
        title: title.to_owned(),
        language: language.to_owned(),
        group_id,
        text_type: kind,
        categories: vec![term.id],
        parent_id,
        is_published: true,
        published_by: Some("seed".to_owned()),
        published_at: Some(now.into()),
        created_at: now.into(),
        updated_at: now.into(),
    };

    let root = text::create(
        db,
        new_text(
            "བྱང་ཆུབ་སེམས་དཔའི་སྤྱོད་པ་ལ་འཇུག་པ།",
            "bo",
            root_group.id,
            text_type::TextType::RootText,
            None,
        ),
    )
    .await?;
    let version = text::create(
        db,
        new_text(
            "The Way of the Bodhisattva",
            "en",
            root_group.id,
            text_type::TextType::Version,
            Some(root.id),
        ),
    )
    .await?;
    let commentary = text::create(
        db,
        new_text(
            "A Commentary on the Way of the Bodhisattva",
            "bo",
            commentary_group.id,
            text_type::TextType::Commentary,
            None,
        ),
    )
    .await?;

    let root_lines = [
        "བདེ་གཤེགས་ཆོས་ཀྱི་སྐུ་མངའ་སྲས་བཅས་དང་། །",
        "ཕྱག་འོས་ཀུན་ལའང་གུས་པར་ཕྱག་འཚལ་ཏེ། །",
        "བདེ་གཤེགས་སྲས་ཀྱི་སྡོམ་ལ་འཇུག་པ་ནི། །",
    ];
    let version_lines = [
        "To those who go in bliss, the dharmakaya, and their heirs,",
        "And all who merit veneration, I respectfully bow.",
        "I shall describe the way to enter the bodhisattva discipline,",
    ];

    let mut root_segments = Vec::new();
    for (index, line) in root_lines.iter().enumerate() {
        root_segments.push(
            segment::create(
                db,
                segments::Model {
                    id: Id::new_v4(),
                    pecha_segment_id: Some(format!("{:02}", index + 1)),
                    text_id: root.id,
                    content: line.to_string(),
                    segment_type: segment_type::SegmentType::Source,
                    mapping: Mappings::default(),
                    revision: 0,
                    created_at: now.into(),
                    updated_at: now.into(),
                },
            )
            .await?,
        );
    }

    let mut version_segments = Vec::new();
    for (index, line) in version_lines.iter().enumerate() {
        version_segments.push(
            segment::create(
                db,
                segments::Model {
                    id: Id::new_v4(),
                    pecha_segment_id: Some(format!("{:02}", index + 1)),
                    text_id: version.id,
                    content: line.to_string(),
                    segment_type: segment_type::SegmentType::Content,
                    mapping: Mappings(vec![Mapping {
                        text_id: root.id,
                        segments: vec![root_segments[index].id],
                    }]),
                    revision: 0,
                    created_at: now.into(),
                    updated_at: now.into(),
                },
            )
            .await?,
        );
    }

    for (index, gloss) in [
        "<b>བདེ་གཤེགས་</b> ཞེས་པ་ནི་",
        "སངས་རྒྱས་ཀྱི་མཚན་གྱི་རྣམ་གྲངས་སོ། །",
    ]
    .iter()
    .enumerate()
    {
        segment::create(
            db,
            segments::Model {
                id: Id::new_v4(),
                pecha_segment_id: Some(format!("{:02}", index + 1)),
                text_id: commentary.id,
                content: gloss.to_string(),
                segment_type: segment_type::SegmentType::Content,
                mapping: Mappings(vec![Mapping {
                    text_id: root.id,
                    segments: vec![root_segments[0].id],
                }]),
                revision: 0,
                created_at: now.into(),
                updated_at: now.into(),
            },
        )
        .await?;
    }

    for (text_id, segment_ids) in [
        (root.id, root_segments.iter().map(|s| s.id).collect::<Vec<_>>()),
        (
            version.id,
            version_segments.iter().map(|s| s.id).collect::<Vec<_>>(),
        ),
    ] {
        let section_id = Id::new_v4();
        table_of_content::create(
            db,
            table_of_contents::Model {
                id: Id::new_v4(),
                text_id,
                toc_type: table_of_content_type::TableOfContentType::Text,
                sections: Sections(vec![Section {
                    id: section_id,
                    title: Some("1".to_owned()),
                    section_number: 1,
                    parent_id: None,
                    segments: segment_ids
                        .into_iter()
                        .enumerate()
                        .map(|(index, segment_id)| TextSegment {
                            segment_id,
                            segment_number: index as i32 + 1,
                        })
                        .collect(),
                    sections: vec![],
                }]),
                created_at: now.into(),
                updated_at: now.into(),
            },
        )
        .await?;
    }

    info!(
        "Seeded root text {}, version {} and commentary {}",
        root.id, version.id, commentary.id
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_parse_str_parses_valid_uuid() {
        let uuid_str = "a98c3295-0933-44cb-89db-7db0f7250fb1";
        let uuid = uuid_parse_str(uuid_str).unwrap();
        assert_eq!(uuid.to_string(), uuid_str);
    }

    #[test]
    fn uuid_parse_str_returns_error_for_invalid_uuid() {
        let result = uuid_parse_str("invalid");
        assert_eq!(
            result.unwrap_err().error_kind,
            error::EntityApiErrorKind::InvalidQueryTerm
        );
    }
}
