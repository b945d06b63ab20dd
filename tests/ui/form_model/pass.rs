use calmform::form::{FieldKey, FieldLens, FieldValues, FormModel};

#[derive(Clone, Debug, PartialEq, calmform::form::FormModel)]
struct SignupForm {
    email: String,
    display_name: String,
}

fn main() {
    let fields = SignupForm::fields();
    let lens = fields.display_name();
    let mut model = SignupForm {
        email: "a@calm.form".to_string(),
        display_name: "Ada".to_string(),
    };
    lens.set(&mut model, "Grace".to_string());
    assert_eq!(lens.key().as_str(), "display_name");
    assert_eq!(lens.get(&model), "Grace");
    assert_eq!(
        SignupForm::field_keys(),
        &[FieldKey::new("email"), FieldKey::new("display_name")]
    );

    let values: FieldValues = [
        (FieldKey::new("email"), "b@calm.form".to_string()),
        (FieldKey::new("display_name"), "Linus".to_string()),
    ]
    .into_iter()
    .collect();
    let rebuilt = SignupForm::from_values(&values).expect("all fields present");
    assert_eq!(rebuilt.email, "b@calm.form");

    let partial: FieldValues = [(FieldKey::new("email"), "c@calm.form".to_string())]
        .into_iter()
        .collect();
    assert!(SignupForm::from_values(&partial).is_err());
}
