use chrono::NaiveDate;
use parish_core::db::open_db_in_memory;
use parish_core::repo::death_repo::{DeathRepository, SqliteDeathRepository};
use parish_core::repo::family_repo::SqliteFamilyRepository;
use parish_core::repo::member_repo::{MemberRepository, SqliteMemberRepository};
use parish_core::service::death_service::DeathRecorder;
use parish_core::{
    DateRange, DeathDetails, DeathSubject, DeathSubmission, ErrorKind, Family, Gender, Member,
    MemberProblem, ParishRegister, RegisterError, ResponseClass, ValidationError,
};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn parishioner_death(member: &Member, sl_no: i64, died: NaiveDate) -> DeathSubmission {
    DeathSubmission {
        sl_no,
        subject: DeathSubject::Parishioner {
            member_id: member.uuid,
            family_number: member.family_number.clone().unwrap(),
        },
        next_hof_candidate: None,
        details: DeathDetails::new(member.name.clone(), died),
    }
}

fn external_death(sl_no: i64, name: &str, died: NaiveDate) -> DeathSubmission {
    DeathSubmission {
        sl_no,
        subject: DeathSubject::External,
        next_hof_candidate: None,
        details: DeathDetails::new(name, died),
    }
}

fn seed(register: &ParishRegister<'_>) -> (Member, Member) {
    register
        .create_family(Family::new("F-1", "Mattathil"))
        .unwrap();
    let head = register
        .add_member(Member::new("Joseph", Gender::Male, date(1948, 2, 2)).in_family("F-1"))
        .unwrap();
    let son = register
        .add_member(Member::new("Paul", Gender::Male, date(1975, 7, 7)).in_family("F-1"))
        .unwrap();
    (head, son)
}

#[test]
fn external_death_touches_no_member() {
    let conn = open_db_in_memory().unwrap();
    let register = ParishRegister::new(&conn);
    let (head, _son) = seed(&register);

    let outcome = register
        .record_death(external_death(1, "Visitor", date(2024, 1, 5)))
        .unwrap();
    assert!(!outcome.record.is_parishioner());

    let head_after = register.get_member(head.uuid).unwrap().unwrap();
    assert!(head_after.is_living());
    assert!(head_after.is_hof);
}

#[test]
fn duplicate_sequence_number_is_rejected_without_side_effects() {
    let conn = open_db_in_memory().unwrap();
    let register = ParishRegister::new(&conn);
    let (_head, son) = seed(&register);
    register
        .record_death(external_death(5, "Visitor", date(2024, 1, 5)))
        .unwrap();

    let err = register
        .record_death(parishioner_death(&son, 5, date(2024, 2, 1)))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateSequence);
    assert_eq!(err.kind().response_class(), ResponseClass::Conflict);

    assert!(register.get_member(son.uuid).unwrap().unwrap().is_living());
}

#[test]
fn deceased_or_misfiled_member_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let register = ParishRegister::new(&conn);
    let (_head, son) = seed(&register);
    register
        .record_death(parishioner_death(&son, 1, date(2024, 2, 1)))
        .unwrap();

    let err = register
        .record_death(parishioner_death(&son, 2, date(2024, 2, 2)))
        .unwrap_err();
    assert!(matches!(
        err,
        RegisterError::MemberInvalid {
            problem: MemberProblem::Deceased,
            ..
        }
    ));

    register.create_family(Family::new("F-2", "Other")).unwrap();
    let neighbour = register
        .add_member(Member::new("Rosa", Gender::Female, date(1980, 1, 1)).in_family("F-2"))
        .unwrap();
    let mut misfiled = parishioner_death(&neighbour, 3, date(2024, 3, 3));
    misfiled.subject = DeathSubject::Parishioner {
        member_id: neighbour.uuid,
        family_number: "F-1".to_string(),
    };
    let err = register.record_death(misfiled).unwrap_err();
    assert!(matches!(
        err,
        RegisterError::MemberInvalid {
            problem: MemberProblem::WrongFamily { .. },
            ..
        }
    ));
}

#[test]
fn unknown_member_or_family_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let register = ParishRegister::new(&conn);
    let (head, _son) = seed(&register);

    let mut submission = parishioner_death(&head, 1, date(2024, 1, 1));
    submission.subject = DeathSubject::Parishioner {
        member_id: uuid::Uuid::new_v4(),
        family_number: "F-1".to_string(),
    };
    let err = register.record_death(submission).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let mut submission = parishioner_death(&head, 1, date(2024, 1, 1));
    submission.subject = DeathSubject::Parishioner {
        member_id: head.uuid,
        family_number: "F-404".to_string(),
    };
    let err = register.record_death(submission).unwrap_err();
    assert_eq!(err.kind().response_class(), ResponseClass::NotFound);
}

#[test]
fn burial_before_death_is_invalid_input() {
    let conn = open_db_in_memory().unwrap();
    let register = ParishRegister::new(&conn);
    let mut submission = external_death(1, "Visitor", date(2024, 5, 10));
    submission.details.burial_date = Some(date(2024, 5, 9));

    let err = register.record_death(submission).unwrap_err();
    assert!(matches!(
        err,
        RegisterError::InvalidInput(ValidationError::BurialBeforeDeath { .. })
    ));
}

#[test]
fn update_replaces_details_and_checks_sequence() {
    let conn = open_db_in_memory().unwrap();
    let register = ParishRegister::new(&conn);
    let first = register
        .record_death(external_death(1, "Visitor", date(2024, 1, 5)))
        .unwrap()
        .record;
    register
        .record_death(external_death(2, "Pilgrim", date(2024, 1, 6)))
        .unwrap();

    let mut details = first.details.clone();
    details.cause_of_death = Some("Old age".to_string());
    details.burial_date = Some(date(2024, 1, 7));
    let updated = register.update_death(first.uuid, 10, details).unwrap();
    assert_eq!(updated.sl_no, 10);
    assert_eq!(updated.details.cause_of_death.as_deref(), Some("Old age"));

    let err = register
        .update_death(first.uuid, 2, updated.details.clone())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateSequence);

    let err = register
        .update_death(uuid::Uuid::new_v4(), 11, updated.details)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn list_filters_by_year_newest_first() {
    let conn = open_db_in_memory().unwrap();
    let register = ParishRegister::new(&conn);
    register
        .record_death(external_death(1, "Early", date(2023, 12, 31)))
        .unwrap();
    register
        .record_death(external_death(2, "Middle", date(2024, 3, 1)))
        .unwrap();
    register
        .record_death(external_death(3, "Late", date(2024, 9, 1)))
        .unwrap();

    let names: Vec<String> = register
        .list_deaths(&DateRange::year(2024))
        .unwrap()
        .into_iter()
        .map(|record| record.details.name)
        .collect();
    assert_eq!(names, vec!["Late", "Middle"]);
    assert_eq!(register.list_deaths(&DateRange::default()).unwrap().len(), 3);
}

#[test]
fn failed_succession_is_compensated_without_transaction() {
    let conn = open_db_in_memory().unwrap();
    let (head, _son) = seed(&ParishRegister::new(&conn));

    // Running the recorder directly leaves only service compensation to undo
    // the partial write.
    let recorder = DeathRecorder::new(
        SqliteMemberRepository::try_new(&conn).unwrap(),
        SqliteFamilyRepository::try_new(&conn).unwrap(),
        SqliteDeathRepository::try_new(&conn).unwrap(),
    );
    let mut submission = parishioner_death(&head, 1, date(2024, 4, 4));
    submission.next_hof_candidate = Some(uuid::Uuid::new_v4());

    let err = recorder.record(submission).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CandidateInvalid);
    assert!(!err.is_fatal());

    let deaths = SqliteDeathRepository::try_new(&conn).unwrap();
    assert!(deaths.find_death_by_sl_no(1).unwrap().is_none());
    let members = SqliteMemberRepository::try_new(&conn).unwrap();
    let restored = members.get_member(head.uuid).unwrap().unwrap();
    assert!(restored.is_living());
    assert!(restored.is_hof);
}
