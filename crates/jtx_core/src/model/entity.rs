//! Read aggregate of one object and its property records.

use super::ical_object::ICalObject;
use super::property::{Attachment, Attendee, Category, Comment, Organizer, Relatedto, Resource};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ICalEntity {
    pub property: ICalObject,
    pub categories: Vec<Category>,
    pub attendees: Vec<Attendee>,
    pub comments: Vec<Comment>,
    pub organizer: Option<Organizer>,
    pub resources: Vec<Resource>,
    pub attachments: Vec<Attachment>,
    pub relatedto: Vec<Relatedto>,
}

impl ICalEntity {
    /// Wraps an object that has no property records yet.
    pub fn bare(property: ICalObject) -> Self {
        Self {
            property,
            categories: Vec::new(),
            attendees: Vec::new(),
            comments: Vec::new(),
            organizer: None,
            resources: Vec::new(),
            attachments: Vec::new(),
            relatedto: Vec::new(),
        }
    }
}
