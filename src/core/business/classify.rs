//! Ordered classification rule sets
//!
//! Each classifier is a list of `(category, predicate)` rules evaluated top
//! to bottom plus a terminal default, so every input maps to exactly one
//! category. Text rules match whole words or phrases on a normalised form of
//! the input (lower-cased, punctuation folded to spaces).

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};

/// One rule: the first rule whose predicate holds decides the category
pub struct Rule<I: ?Sized + 'static> {
    pub category: &'static str,
    pub when: fn(&I) -> bool,
}

/// Ordered rules with a mandatory default
pub struct RuleSet<I: ?Sized + 'static> {
    pub rules: &'static [Rule<I>],
    pub default: &'static str,
}

impl<I: ?Sized + 'static> RuleSet<I> {
    pub fn classify(&self, input: &I) -> &'static str {
        self.rules
            .iter()
            .find(|rule| (rule.when)(input))
            .map_or(self.default, |rule| rule.category)
    }

    /// Every category this set can produce, default last
    pub fn categories(&self) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = Vec::new();
        for rule in self.rules {
            if !out.contains(&rule.category) {
                out.push(rule.category);
            }
        }
        if !out.contains(&self.default) {
            out.push(self.default);
        }
        out
    }
}

/// Lower-case, punctuation to single spaces, padded with spaces
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(' ');
    for c in text.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with(' ') {
            out.push(' ');
        }
    }
    if !out.ends_with(' ') {
        out.push(' ');
    }
    out
}

/// True if any phrase occurs in `text` on word boundaries
///
/// Phrases are given in normalised form (`"med surg"`, `"l d"`).
pub fn has_phrase(text: &str, phrases: &[&str]) -> bool {
    let normalized = normalize(text);
    phrases
        .iter()
        .any(|p| normalized.contains(&format!(" {} ", p)))
}

// Clinical role, from job title

pub static CLINICAL_ROLE: RuleSet<str> = RuleSet {
    rules: &[
        Rule {
            category: "Advanced Practice",
            when: |t| {
                has_phrase(
                    t,
                    &[
                        "nurse practitioner",
                        "np",
                        "aprn",
                        "physician assistant",
                        "pa c",
                        "crna",
                        "nurse anesthetist",
                        "cnm",
                        "nurse midwife",
                        "clinical nurse specialist",
                    ],
                )
            },
        },
        Rule {
            category: "RN",
            when: |t| has_phrase(t, &["rn", "registered nurse", "charge nurse", "staff nurse"]),
        },
        Rule {
            category: "LPN",
            when: |t| {
                has_phrase(
                    t,
                    &["lpn", "lvn", "licensed practical nurse", "licensed vocational nurse"],
                )
            },
        },
        Rule {
            category: "CNA",
            when: |t| {
                has_phrase(
                    t,
                    &[
                        "cna",
                        "nursing assistant",
                        "nurse aide",
                        "nursing aide",
                        "patient care technician",
                        "patient care tech",
                        "pct",
                    ],
                )
            },
        },
        Rule {
            category: "Physician",
            when: |t| {
                has_phrase(
                    t,
                    &[
                        "physician",
                        "md",
                        "do",
                        "doctor",
                        "hospitalist",
                        "surgeon",
                        "anesthesiologist",
                        "radiologist",
                        "resident",
                    ],
                )
            },
        },
        Rule {
            category: "Therapist",
            when: |t| has_phrase(t, &["therapist", "therapy", "pt", "ot", "rt", "slp"]),
        },
        Rule {
            category: "Pharmacy",
            when: |t| has_phrase(t, &["pharmacist", "pharmacy", "pharm d", "pharmd"]),
        },
        Rule {
            category: "Technician",
            when: |t| has_phrase(t, &["technician", "tech", "technologist", "phlebotomist"]),
        },
        Rule {
            category: "Administrative",
            when: |t| {
                has_phrase(
                    t,
                    &[
                        "administrator",
                        "administrative",
                        "admin",
                        "manager",
                        "director",
                        "coordinator",
                        "clerk",
                        "secretary",
                        "receptionist",
                        "billing",
                        "analyst",
                        "accountant",
                        "payroll",
                        "hr",
                        "registrar",
                        "scheduler",
                    ],
                )
            },
        },
        Rule {
            category: "Support Services",
            when: |t| {
                has_phrase(
                    t,
                    &[
                        "environmental services",
                        "evs",
                        "housekeeping",
                        "housekeeper",
                        "dietary",
                        "food service",
                        "cook",
                        "transporter",
                        "transport",
                        "security",
                        "maintenance",
                        "facilities",
                        "custodian",
                        "janitor",
                    ],
                )
            },
        },
    ],
    default: "Other",
};

// Care-unit type, from department

pub static CARE_UNIT: RuleSet<str> = RuleSet {
    rules: &[
        Rule {
            category: "ICU/Critical Care",
            when: |d| {
                has_phrase(
                    d,
                    &["icu", "intensive care", "critical care", "ccu", "micu", "sicu", "nicu", "picu"],
                )
            },
        },
        Rule {
            category: "Emergency Department",
            when: |d| has_phrase(d, &["emergency", "er", "ed", "trauma"]),
        },
        Rule {
            category: "Medical/Surgical",
            when: |d| {
                has_phrase(
                    d,
                    &["med surg", "medical surgical", "medsurg", "telemetry", "med tele"],
                )
            },
        },
        Rule {
            category: "Surgical Services",
            when: |d| {
                has_phrase(
                    d,
                    &[
                        "surgery",
                        "surgical",
                        "operating room",
                        "or",
                        "pacu",
                        "perioperative",
                        "periop",
                        "anesthesia",
                    ],
                )
            },
        },
        Rule {
            category: "Pediatrics",
            when: |d| has_phrase(d, &["pediatric", "pediatrics", "peds", "children s", "childrens"]),
        },
        Rule {
            category: "Maternity/L&D",
            when: |d| {
                has_phrase(
                    d,
                    &[
                        "maternity",
                        "labor",
                        "delivery",
                        "l d",
                        "obstetrics",
                        "ob",
                        "postpartum",
                        "women s health",
                        "mother baby",
                    ],
                )
            },
        },
        Rule {
            category: "Behavioral Health",
            when: |d| {
                has_phrase(
                    d,
                    &["behavioral", "psychiatric", "psychiatry", "psych", "mental health"],
                )
            },
        },
        Rule {
            category: "Outpatient/Clinic",
            when: |d| has_phrase(d, &["clinic", "outpatient", "ambulatory", "urgent care"]),
        },
        Rule {
            category: "Non-Clinical",
            when: |d| {
                has_phrase(
                    d,
                    &[
                        "administration",
                        "admin",
                        "human resources",
                        "hr",
                        "finance",
                        "accounting",
                        "billing",
                        "it",
                        "information technology",
                        "information systems",
                        "facilities",
                        "environmental services",
                        "dietary",
                        "food services",
                        "security",
                        "maintenance",
                        "payroll",
                        "marketing",
                    ],
                )
            },
        },
    ],
    default: "Unknown",
};

// Shift type, from the shift label and clock-in time

/// Inputs for shift classification
pub struct ShiftInput {
    pub label: Option<String>,
    pub clock_in: Option<NaiveDateTime>,
}

const NIGHT_LABELS: &[&str] = &["night", "nights", "noc", "overnight", "graveyard", "third"];
const EVENING_LABELS: &[&str] = &["evening", "evenings", "eve", "pm", "swing", "second"];
const DAY_LABELS: &[&str] = &["day", "days", "am", "first"];

fn label_is(input: &ShiftInput, phrases: &[&str]) -> bool {
    input.label.as_deref().is_some_and(|l| has_phrase(l, phrases))
}

/// Clock-in hour, used only when the label is missing or unrecognised
fn fallback_hour(input: &ShiftInput) -> Option<u32> {
    let labelled =
        label_is(input, NIGHT_LABELS) || label_is(input, EVENING_LABELS) || label_is(input, DAY_LABELS);
    if labelled {
        None
    } else {
        input.clock_in.map(|ts| ts.hour())
    }
}

pub static SHIFT_TYPE: RuleSet<ShiftInput> = RuleSet {
    rules: &[
        Rule {
            category: "Night",
            when: |s| label_is(s, NIGHT_LABELS),
        },
        Rule {
            category: "Evening",
            when: |s| label_is(s, EVENING_LABELS),
        },
        Rule {
            category: "Day",
            when: |s| label_is(s, DAY_LABELS),
        },
        Rule {
            category: "Day",
            when: |s| fallback_hour(s).is_some_and(|h| (7..15).contains(&h)),
        },
        Rule {
            category: "Evening",
            when: |s| fallback_hour(s).is_some_and(|h| (15..23).contains(&h)),
        },
        Rule {
            category: "Night",
            when: |s| fallback_hour(s).is_some_and(|h| h >= 23 || h < 7),
        },
    ],
    default: "Unknown",
};

/// Shift type for a label and clock-in time
pub fn shift_type(label: Option<&str>, clock_in: Option<NaiveDateTime>) -> &'static str {
    SHIFT_TYPE.classify(&ShiftInput {
        label: label.map(str::to_string),
        clock_in,
    })
}

// Burnout risk, from overtime share and extended shifts

/// Inputs for burnout classification; `None` means no data
pub struct BurnoutInput {
    pub overtime_pct: Option<f64>,
    pub extended_shifts: Option<i64>,
}

pub static BURNOUT_RISK: RuleSet<BurnoutInput> = RuleSet {
    rules: &[
        Rule {
            category: "High Risk",
            when: |b| {
                b.overtime_pct.is_some_and(|p| p >= 20.0) || b.extended_shifts.is_some_and(|n| n >= 10)
            },
        },
        Rule {
            category: "Moderate Risk",
            when: |b| {
                b.overtime_pct.is_some_and(|p| p >= 10.0) || b.extended_shifts.is_some_and(|n| n >= 5)
            },
        },
        Rule {
            category: "Low Risk",
            when: |b| b.overtime_pct.is_some() || b.extended_shifts.is_some(),
        },
    ],
    default: "Unknown",
};

// Tenure and age bands, from whole years

pub static TENURE_BAND: RuleSet<Option<i64>> = RuleSet {
    rules: &[
        Rule {
            category: "< 1 year",
            when: |y| y.is_some_and(|y| (0..1).contains(&y)),
        },
        Rule {
            category: "1-2 years",
            when: |y| y.is_some_and(|y| (1..3).contains(&y)),
        },
        Rule {
            category: "3-5 years",
            when: |y| y.is_some_and(|y| (3..6).contains(&y)),
        },
        Rule {
            category: "6-10 years",
            when: |y| y.is_some_and(|y| (6..10).contains(&y)),
        },
        Rule {
            category: "10+ years",
            when: |y| y.is_some_and(|y| y >= 10),
        },
    ],
    default: "Unknown",
};

pub static AGE_BAND: RuleSet<Option<i64>> = RuleSet {
    rules: &[
        Rule {
            category: "Under 25",
            when: |a| a.is_some_and(|a| (0..25).contains(&a)),
        },
        Rule {
            category: "25-34",
            when: |a| a.is_some_and(|a| (25..35).contains(&a)),
        },
        Rule {
            category: "35-44",
            when: |a| a.is_some_and(|a| (35..45).contains(&a)),
        },
        Rule {
            category: "45-54",
            when: |a| a.is_some_and(|a| (45..55).contains(&a)),
        },
        Rule {
            category: "55-64",
            when: |a| a.is_some_and(|a| (55..65).contains(&a)),
        },
        Rule {
            category: "65+",
            when: |a| a.is_some_and(|a| a >= 65),
        },
    ],
    default: "Unknown",
};

// Attendance status, from the raw status and hours worked

/// Inputs for attendance status classification
pub struct AttendanceInput<'a> {
    pub status: Option<&'a str>,
    pub hours: Option<f64>,
}

const ABSENT_STATUSES: &[&str] = &[
    "absent", "absence", "no show", "noshow", "ncns", "call out", "callout", "called out", "sick",
    "unexcused",
];
const LATE_STATUSES: &[&str] = &["late", "tardy"];
const PRESENT_STATUSES: &[&str] = &["present", "worked", "on time", "ontime", "complete", "completed"];

/// Attendance status: `Absent`, `Late`, `Present` or `Unknown`
pub fn attendance_status(input: &AttendanceInput<'_>) -> &'static str {
    let status_is = |phrases: &[&str]| input.status.is_some_and(|s| has_phrase(s, phrases));
    if status_is(ABSENT_STATUSES) {
        "Absent"
    } else if status_is(LATE_STATUSES) {
        "Late"
    } else if status_is(PRESENT_STATUSES) || input.hours.is_some_and(|h| h > 0.0) {
        "Present"
    } else {
        "Unknown"
    }
}

/// `Weekend` for Saturday and Sunday, otherwise `Weekday`
pub fn day_type(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Sat | Weekday::Sun => "Weekend",
        _ => "Weekday",
    }
}

/// Earning codes that mark an overtime line
pub fn is_overtime_code(code: Option<&str>) -> bool {
    code.is_some_and(|c| has_phrase(c, &["ot", "ovt", "overtime", "ot1", "ot2", "dt", "double time"]))
}

/// Whole years between two dates, `None` if `to` precedes `from`
pub fn whole_years(from: NaiveDate, to: NaiveDate) -> Option<i64> {
    if to < from {
        return None;
    }
    let mut years = i64::from(to.year() - from.year());
    if (to.month(), to.day()) < (from.month(), from.day()) {
        years -= 1;
    }
    Some(years)
}
