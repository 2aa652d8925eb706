use super::*;

const LECTURE_FORM: &str = r#"
    <p id="table-students">1</p>
    <form class="form" action="/saveLecture">
      <input id="form-date" type="hidden" name="date" value="2024-04-01T09:00">
      <div id="form-students">
        <input id="form-studentId" type="hidden" name="studentId" value="3">
      </div>
    </form>"#;

#[test]
fn assignments_split_on_first_equals() {
    assert_eq!(
        parse_assignment("form-date=2024-05-01T10:00"),
        Ok(("form-date".to_string(), "2024-05-01T10:00".to_string()))
    );
    assert_eq!(
        parse_assignment("note=a=b"),
        Ok(("note".to_string(), "a=b".to_string()))
    );
    assert!(parse_assignment("=value").is_err());
    assert!(parse_assignment("no-separator").is_err());
}

#[test]
fn submit_subcommand_collects_repeated_flags() {
    let cli = Cli::try_parse_from([
        "fragctl",
        "--json",
        "submit",
        "/lectureEditor?id=12",
        "--set",
        "form-date=2024-05-01T10:00",
        "--toggle-student",
        "3",
        "--toggle-student",
        "4",
        "--target",
        "modal",
    ])
    .expect("parse");

    assert!(cli.json);
    let Command::Submit {
        page_url,
        set,
        toggle_student,
        target,
    } = cli.command
    else {
        panic!("expected submit");
    };
    assert_eq!(page_url, "/lectureEditor?id=12");
    assert_eq!(set.len(), 1);
    assert_eq!(toggle_student, vec!["3", "4"]);
    assert_eq!(Container::from(target), Container::Modal);
}

#[test]
fn get_accepts_lowercase_method() {
    let cli = Cli::try_parse_from(["fragctl", "get", "/lectures", "--method", "post"]).expect("parse");
    assert!(matches!(
        cli.command,
        Command::Get {
            method: Method::Post,
            title: None,
            ..
        }
    ));
}

#[test]
fn edits_update_fields_and_student_projection() {
    let mut doc = Document::new();
    doc.replace_content(Container::Fragment, LECTURE_FORM);

    apply_edits(
        &mut doc,
        &[("form-date".into(), "2024-05-01T10:00".into())],
        &["3".into(), "4".into()],
    );

    let form = doc.form().expect("form");
    assert_eq!(
        form.serialize(),
        "date=2024-05-01T10%3A00&studentId=4"
    );
    assert_eq!(doc.text("table-students"), Some("1"));
}
