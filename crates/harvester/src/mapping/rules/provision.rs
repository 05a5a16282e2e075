//! Copyright date (264 ind2 4), edition (250) and provision activity (260/264)

use regex::Regex;
use std::sync::LazyLock;

use crate::mapping::language::language_script;
use crate::mapping::punctuation::remove_trailing_punctuation;
use crate::mapping::{Applied, TransformContext};
use crate::marc::DataField;
use crate::models::{
    ActivityType, Document, EditionStatement, LocalizedValue, Place, ProvisionActivity, Statement,
    StatementType,
};

static COPYRIGHT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([©℗c])+\s*(\d{4}.*)").expect("copyright pattern is valid"));

/// Years outside `[MIN_YEAR, MAX_YEAR)` are discarded
const MIN_YEAR: i32 = -9999;
const MAX_YEAR: i32 = 2050;

const OPEN_END_DATE: &str = "9999";
const UNCERTAIN_DATE_NOTE: &str = "Date(s) incertaine(s) ou inconnue(s)";
const PLACE_TYPE: &str = "bf:Place";

pub fn copyright_date(doc: &mut Document, field: &DataField, _ctx: &TransformContext) -> Applied {
    let mut applied = Applied::Ignored;
    for raw in field.values('c') {
        let Some(caps) = COPYRIGHT.captures(raw.trim()) else {
            continue;
        };
        let symbol = match &caps[1] {
            "c" => "©",
            other => other,
        };
        doc.copyright_date.push(format!("{symbol} {}", &caps[2]));
        applied = Applied::Contributed;
    }
    applied
}

/// Subfield value plus the matching value of the linked `880`, if any
fn localized_values(
    field: &DataField,
    code: char,
    n: usize,
    value: &str,
    ctx: &TransformContext,
) -> Vec<LocalizedValue> {
    let mut values = vec![LocalizedValue::plain(remove_trailing_punctuation(value))];

    if let Some(alternate) = ctx.alternate_graphic.for_field(field) {
        if let Some(vernacular) = alternate.field.nth(code, n) {
            values.push(LocalizedValue {
                value: remove_trailing_punctuation(vernacular),
                language: Some(language_script(alternate.script, ctx)),
            });
        }
    }

    values
}

pub fn edition(doc: &mut Document, field: &DataField, ctx: &TransformContext) -> Applied {
    let mut statement = EditionStatement::default();

    if let Some(designation) = field.first('a') {
        statement.edition_designation = localized_values(field, 'a', 0, designation, ctx);
    }
    if let Some(responsibility) = field.first('b') {
        statement.responsibility = localized_values(field, 'b', 0, responsibility, ctx);
    }

    if statement == EditionStatement::default() {
        return Applied::Ignored;
    }
    doc.edition_statement.push(statement);
    Applied::Contributed
}

fn activity_type(ind2: char) -> Option<ActivityType> {
    match ind2 {
        ' ' | '_' | '1' => Some(ActivityType::Publication),
        '0' => Some(ActivityType::Production),
        '2' => Some(ActivityType::Distribution),
        '3' => Some(ActivityType::Manufacture),
        _ => None,
    }
}

/// Year from a fixed-position date, `None` for blanks, pipes, `9999`
/// and anything out of range.
pub fn make_year(raw: Option<&str>) -> Option<i32> {
    let value = raw?.trim();
    if value.is_empty() || value.chars().all(|c| c == '|') || value == OPEN_END_DATE {
        return None;
    }
    value
        .parse::<i32>()
        .ok()
        .filter(|year| (MIN_YEAR..MAX_YEAR).contains(year))
}

pub fn provision_activity(doc: &mut Document, field: &DataField, ctx: &TransformContext) -> Applied {
    // 260 carries publication data whatever its second indicator
    let ind2 = if field.tag == "260" { ' ' } else { field.ind2 };
    let Some(activity_type) = activity_type(ind2) else {
        return Applied::Ignored;
    };

    let mut activity = ProvisionActivity {
        activity_type,
        start_date: None,
        end_date: None,
        note: None,
        place: Vec::new(),
        statement: Vec::new(),
    };

    if activity_type == ActivityType::Publication {
        activity.start_date = make_year(ctx.date1.as_deref());
        activity.end_date = make_year(ctx.date2.as_deref());
        if matches!(ctx.date_type, Some('q') | Some('n')) {
            activity.note = Some(UNCERTAIN_DATE_NOTE.to_string());
        }
        if let Some(country) = &ctx.country {
            activity.place.push(Place {
                country: Some(country.clone()),
                place_type: PLACE_TYPE.to_string(),
            });
        }
    }

    let (mut places, mut agents) = (0, 0);
    for subfield in &field.subfields {
        let (statement_type, n) = match subfield.code {
            'a' => {
                places += 1;
                (StatementType::Place, places - 1)
            }
            'b' => {
                agents += 1;
                (StatementType::Agent, agents - 1)
            }
            _ => continue,
        };
        activity.statement.push(Statement {
            statement_type,
            label: localized_values(field, subfield.code, n, &subfield.value, ctx),
        });
    }

    if let Some(date) = field.first('c') {
        activity.statement.push(Statement {
            statement_type: StatementType::Date,
            label: localized_values(field, 'c', 0, date, ctx),
        });
    }

    doc.provision_activity.push(activity);
    Applied::Contributed
}
