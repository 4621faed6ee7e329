//! Common regex patterns for declaration text extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Field code (3 or 4 digits) followed by its value on the same line
    pub static ref FIELD_VALUE: Regex = Regex::new(
        r"([0-9]{3,4})\s+(-?[0-9.,]+)"
    ).unwrap();

    // Longest leading decimal of a canonicalized amount
    pub static ref LEADING_DECIMAL: Regex = Regex::new(
        r"^([+-]?)(?:([0-9]+)(?:\.([0-9]*))?|\.([0-9]+))"
    ).unwrap();

    // Fiscal period: "MARZO 2024" or "PRIMER SEMESTRE 2024"
    pub static ref PERIOD: Regex = Regex::new(
        r"(?i)(ENERO|FEBRERO|MARZO|ABRIL|MAYO|JUNIO|JULIO|AGOSTO|SEPTIEMBRE|OCTUBRE|NOVIEMBRE|DICIEMBRE)\s+([0-9]{4})|(PRIMER|SEGUNDO)\s+SEMESTRE\s+([0-9]{4})"
    ).unwrap();

    // Declaration variant
    pub static ref DECLARATION_KIND: Regex = Regex::new(
        r"(?i)(ORIGINAL|SUSTITUTIVA)"
    ).unwrap();

    // Taxpayer id (RUC): exactly 13 digits after the identification label
    pub static ref TAXPAYER_ID: Regex = Regex::new(
        r"(?i)(?:IDENTIFICACIÓN(?: DEL SUJETO PASIVO)?|RUC)\s*([0-9]{13})(?:[^0-9]|$)"
    ).unwrap();

    // Legal name, up to the next 3-digit run or line end
    pub static ref LEGAL_NAME: Regex = Regex::new(
        r"(?i)RAZÓN SOCIAL(?: O APELLIDOS Y NOMBRES COMPLETOS)?\s+([A-ZÑÁÉÍÓÚÜ\s]+?)(?:\s+[0-9]{3}|\n|$)"
    ).unwrap();
}
