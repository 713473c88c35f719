/// Dutch currency rendering for loan amounts: thousands separated by `.`,
/// decimals by `,`, and whole amounts written as `,-`.
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as i64;
    let sign = if amount.is_sign_negative() && cents > 0 {
        "-"
    } else {
        ""
    };
    let whole = (cents / 100).to_string();
    let fraction = (cents % 100) as u8;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    if fraction == 0 {
        format!("€ {sign}{grouped},-")
    } else {
        format!("€ {sign}{grouped},{fraction:02}")
    }
}
