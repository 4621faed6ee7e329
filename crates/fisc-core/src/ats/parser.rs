//! Streaming reader for ATS markup.

use std::collections::{BTreeMap, HashMap};

use quick_xml::events::Event;
use quick_xml::Reader;
use rust_decimal::Decimal;
use tracing::debug;

use super::summary::{
    period_label, IncomeWithholdingSummary, PurchaseSummary, StructuredPeriodSummary,
    SummaryHeader, VatBucket, VatWithholdingBuckets,
};
use crate::declaration::rules::{checked_sum, parse_plain_decimal};
use crate::error::StructuredError;
use crate::models::period::PeriodMode;
use crate::models::schema::Catalog;

const ROOT: &str = "iva";
const PURCHASE_ITEM: &str = "detalleCompras";
const INCOME_WITHHOLDING: &str = "detalleAir";
const HEADER_TAGS: [&str; 4] = ["IdInformante", "razonSocial", "Anio", "Mes"];

/// First text of each element seen within a scope.
#[derive(Debug, Default)]
struct Scope {
    values: HashMap<String, String>,
}

impl Scope {
    /// Claim the element if it is the first of its name; later ones are ignored.
    fn claim(&mut self, name: &str) -> bool {
        if self.values.contains_key(name) {
            return false;
        }
        self.values.insert(name.to_string(), String::new());
        true
    }

    fn append(&mut self, name: &str, text: &str) {
        if let Some(value) = self.values.get_mut(name) {
            value.push_str(text);
        }
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|s| s.trim()).filter(|s| !s.is_empty())
    }

    fn amount(&self, name: &str) -> Decimal {
        self.text(name)
            .and_then(parse_plain_decimal)
            .unwrap_or(Decimal::ZERO)
    }
}

/// An open element and the scopes its text belongs to.
struct Frame {
    name: String,
    header: bool,
    item: bool,
    withholding: bool,
}

#[derive(Default)]
struct PurchaseItem {
    scope: Scope,
    withholdings: Vec<Scope>,
}

struct Accumulator<'a> {
    catalog: &'a Catalog,
    purchases: BTreeMap<String, PurchaseSummary>,
    withholdings: BTreeMap<String, IncomeWithholdingSummary>,
    buckets: VatWithholdingBuckets,
    items: usize,
}

impl<'a> Accumulator<'a> {
    fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            purchases: BTreeMap::new(),
            withholdings: BTreeMap::new(),
            buckets: VatWithholdingBuckets::default(),
            items: 0,
        }
    }

    fn add_item(&mut self, item: PurchaseItem) -> Result<(), StructuredError> {
        let scope = &item.scope;
        let code = scope.text("tipoComprobante").unwrap_or("00").to_string();

        let mut line = PurchaseSummary::new(code.clone(), "");
        line.count = 1;
        line.base_zero_rate = scope.amount("baseImponible");
        line.base_standard_rate = scope.amount("baseImpGrav");
        line.base_non_subject = checked_sum([scope.amount("baseNoGraIva"), scope.amount("baseImpExe")])
            .ok_or(StructuredError::Overflow)?;
        line.vat_amount = scope.amount("montoIva");

        let catalog = self.catalog;
        self.purchases
            .entry(code.clone())
            .or_insert_with(|| PurchaseSummary::new(code.clone(), catalog.document_type_label(&code)))
            .checked_merge(&line)
            .ok_or(StructuredError::Overflow)?;

        for entry in &item.withholdings {
            let base = entry.amount("baseImpAir");
            let retained = entry.amount("valRetAir");
            if base <= Decimal::ZERO && retained <= Decimal::ZERO {
                continue;
            }

            let code = entry.text("codRetAir").unwrap_or("000").to_string();
            let mut line = IncomeWithholdingSummary::new(code.clone(), "");
            line.count = 1;
            line.base = base;
            line.retained = retained;

            self.withholdings
                .entry(code.clone())
                .or_insert_with(|| IncomeWithholdingSummary::new(code.clone(), catalog.retention_label(&code)))
                .checked_merge(&line)
                .ok_or(StructuredError::Overflow)?;
        }

        for bucket in VatBucket::ALL {
            self.buckets
                .checked_add(bucket, scope.amount(bucket.tag()))
                .ok_or(StructuredError::Overflow)?;
        }

        self.items += 1;
        Ok(())
    }
}

/// Parse one ATS document using the fallback category labels.
pub fn parse_document(
    name: &str,
    xml: &str,
    mode: PeriodMode,
) -> Result<StructuredPeriodSummary, StructuredError> {
    parse_document_with(name, xml, mode, &Catalog::default())
}

/// Parse one ATS document, labelling categories from the catalog.
pub fn parse_document_with(
    name: &str,
    xml: &str,
    mode: PeriodMode,
    catalog: &Catalog,
) -> Result<StructuredPeriodSummary, StructuredError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut header = Scope::default();
    let mut item: Option<PurchaseItem> = None;
    let mut withholding: Option<Scope> = None;
    let mut seen_root = false;
    let mut acc = Accumulator::new(catalog);

    loop {
        let (element, empty) = match reader.read_event() {
            Ok(Event::Start(e)) => (String::from_utf8_lossy(e.local_name().as_ref()).into_owned(), false),
            Ok(Event::Empty(e)) => (String::from_utf8_lossy(e.local_name().as_ref()).into_owned(), true),
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|e| StructuredError::Xml(e.to_string()))?;
                append_text(&stack, &mut header, &mut item, &mut withholding, &text);
                continue;
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                append_text(&stack, &mut header, &mut item, &mut withholding, &text);
                continue;
            }
            Ok(Event::End(_)) => {
                if let Some(frame) = stack.pop() {
                    close(&frame.name, &mut item, &mut withholding, &mut acc)?;
                }
                continue;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(StructuredError::Xml(e.to_string())),
            Ok(_) => continue,
        };

        let in_root = element == ROOT || stack.iter().any(|f| f.name == ROOT);
        seen_root |= element == ROOT;

        if element == PURCHASE_ITEM && item.is_none() {
            item = Some(PurchaseItem::default());
        } else if element == INCOME_WITHHOLDING && item.is_some() && withholding.is_none() {
            withholding = Some(Scope::default());
        }

        let frame = Frame {
            header: in_root && HEADER_TAGS.contains(&element.as_str()) && header.claim(&element),
            item: item.as_mut().is_some_and(|i| i.scope.claim(&element)),
            withholding: withholding.as_mut().is_some_and(|w| w.claim(&element)),
            name: element,
        };

        if empty {
            close(&frame.name, &mut item, &mut withholding, &mut acc)?;
        } else {
            stack.push(frame);
        }
    }

    if let Some(open) = stack.last() {
        return Err(StructuredError::Xml(format!("unclosed element '{}'", open.name)));
    }
    if !seen_root {
        return Err(StructuredError::MissingRoot(ROOT));
    }

    let year = header.text("Anio").unwrap_or_default().to_string();
    let month = header.text("Mes").unwrap_or("00").to_string();
    let label = period_label(&month, &year, mode);

    debug!(
        "Parsed {}: {} purchase items, period '{}'",
        name, acc.items, label
    );

    let summary_header = SummaryHeader {
        source_name: name.to_string(),
        taxpayer_id: header.text("IdInformante").unwrap_or_default().to_string(),
        legal_name: header.text("razonSocial").unwrap_or_default().to_string(),
        year,
        month,
        period_label: label,
    };

    StructuredPeriodSummary::assemble(summary_header, acc.purchases, acc.withholdings, acc.buckets)
        .ok_or(StructuredError::Overflow)
}

fn append_text(
    stack: &[Frame],
    header: &mut Scope,
    item: &mut Option<PurchaseItem>,
    withholding: &mut Option<Scope>,
    text: &str,
) {
    let Some(frame) = stack.last() else { return };
    if frame.header {
        header.append(&frame.name, text);
    }
    if frame.item {
        if let Some(item) = item.as_mut() {
            item.scope.append(&frame.name, text);
        }
    }
    if frame.withholding {
        if let Some(withholding) = withholding.as_mut() {
            withholding.append(&frame.name, text);
        }
    }
}

fn close(
    element: &str,
    item: &mut Option<PurchaseItem>,
    withholding: &mut Option<Scope>,
    acc: &mut Accumulator<'_>,
) -> Result<(), StructuredError> {
    if element == INCOME_WITHHOLDING {
        if let (Some(entry), Some(item)) = (withholding.take(), item.as_mut()) {
            item.withholdings.push(entry);
        }
    } else if element == PURCHASE_ITEM {
        if let Some(done) = item.take() {
            acc.add_item(done)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ats::VatBucket;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    const ATS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<iva>
  <TipoIDInformante>R</TipoIDInformante>
  <IdInformante>1790012345001</IdInformante>
  <razonSocial>COMERCIAL ANDINA S.A.</razonSocial>
  <Anio>2024</Anio>
  <Mes>06</Mes>
  <compras>
    <detalleCompras>
      <tipoComprobante>01</tipoComprobante>
      <baseNoGraIva>10.00</baseNoGraIva>
      <baseImponible>20.00</baseImponible>
      <baseImpGrav>500.00</baseImpGrav>
      <baseImpExe>5.00</baseImpExe>
      <montoIva>75.00</montoIva>
      <valRetBien10>0.00</valRetBien10>
      <valorRetBienes>22.50</valorRetBienes>
      <valorRetencionNc>0.00</valorRetencionNc>
      <air>
        <detalleAir>
          <codRetAir>312</codRetAir>
          <baseImpAir>500.00</baseImpAir>
          <valRetAir>8.75</valRetAir>
        </detalleAir>
        <detalleAir>
          <codRetAir>332</codRetAir>
          <baseImpAir>0.00</baseImpAir>
          <valRetAir>0.00</valRetAir>
        </detalleAir>
      </air>
    </detalleCompras>
    <detalleCompras>
      <tipoComprobante>04</tipoComprobante>
      <baseImpGrav>100.00</baseImpGrav>
      <montoIva>15.00</montoIva>
    </detalleCompras>
    <detalleCompras>
      <tipoComprobante>01</tipoComprobante>
      <baseImpGrav>abc</baseImpGrav>
      <montoIva/>
    </detalleCompras>
  </compras>
</iva>"#;

    #[test]
    fn test_parse_document() {
        let summary = parse_document("junio.xml", ATS, PeriodMode::Monthly).unwrap();

        assert_eq!(summary.taxpayer_id, "1790012345001");
        assert_eq!(summary.legal_name, "COMERCIAL ANDINA S.A.");
        assert_eq!(summary.period_label, "JUNIO 2024");

        assert_eq!(summary.purchases.len(), 2);
        let invoices = &summary.purchases[0];
        assert_eq!(invoices.code, "01");
        assert_eq!(invoices.label, "TIPO 01");
        assert_eq!(invoices.count, 2);
        assert_eq!(invoices.base_zero_rate, dec("20.00"));
        assert_eq!(invoices.base_standard_rate, dec("500.00"));
        assert_eq!(invoices.base_non_subject, dec("15.00"));

        let credit = &summary.purchases[1];
        assert_eq!(credit.code, "04");
        assert_eq!(credit.base_standard_rate, dec("100.00"));
        assert_eq!(summary.totals.purchases.base_standard_rate, dec("400.00"));
        assert_eq!(summary.totals.purchases.vat_amount, dec("60.00"));

        assert_eq!(summary.income_withholdings.len(), 1);
        assert_eq!(summary.income_withholdings[0].code, "312");
        assert_eq!(summary.income_withholdings[0].retained, dec("8.75"));

        let buckets = summary.vat_buckets.project();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].bucket, VatBucket::Thirty);
        assert_eq!(summary.totals.vat_withheld, dec("22.50"));
    }

    #[test]
    fn test_semiannual_label_and_catalog() {
        let mut catalog = Catalog::default();
        catalog.document_types.insert("01".into(), "FACTURA".into());
        catalog.retention_codes.insert("312".into(), "TRANSFERENCIA DE BIENES".into());

        let summary = parse_document_with("junio.xml", ATS, PeriodMode::Semiannual, &catalog).unwrap();

        assert_eq!(summary.period_label, "1er SEMESTRE 2024");
        assert_eq!(summary.purchases[0].label, "FACTURA");
        assert_eq!(summary.purchases[1].label, "TIPO 04");
        assert_eq!(summary.income_withholdings[0].label, "TRANSFERENCIA DE BIENES");
    }

    #[test]
    fn test_no_items_gives_empty_summary() {
        let summary = parse_document("vacio.xml", "<iva><Anio>2024</Anio></iva>", PeriodMode::Monthly).unwrap();

        assert_eq!(summary.month, "00");
        assert_eq!(summary.period_label, "DESCONOCIDO 2024");
        assert!(summary.purchases.is_empty());
        assert!(summary.income_withholdings.is_empty());
        assert!(summary.vat_buckets.project().is_empty());
        assert_eq!(summary.totals.purchases.base_standard_rate, Decimal::ZERO);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let xml = "<iva><Mes>01</Mes><Mes>02</Mes><detalleCompras>\
                   <baseImpGrav>10</baseImpGrav><baseImpGrav>99</baseImpGrav>\
                   </detalleCompras></iva>";
        let summary = parse_document("a.xml", xml, PeriodMode::Monthly).unwrap();

        assert_eq!(summary.month, "01");
        assert_eq!(summary.purchases[0].code, "00");
        assert_eq!(summary.purchases[0].base_standard_rate, dec("10"));
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(
            parse_document("a.xml", "<compras><detalleCompras/></compras>", PeriodMode::Monthly),
            Err(StructuredError::MissingRoot("iva"))
        );
        assert!(matches!(
            parse_document("b.xml", "<iva><Anio>2024</Mes></iva>", PeriodMode::Monthly),
            Err(StructuredError::Xml(_))
        ));
        assert!(matches!(
            parse_document("c.xml", "<iva><Anio>2024</Anio>", PeriodMode::Monthly),
            Err(StructuredError::Xml(_))
        ));
    }

    #[test]
    fn test_amount_overflow_fails_the_document() {
        let item = "<detalleCompras><tipoComprobante>01</tipoComprobante>\
                    <baseImpGrav>79228162514264337593543950335</baseImpGrav></detalleCompras>";
        let xml = format!("<iva><Anio>2024</Anio><Mes>01</Mes><compras>{}{}</compras></iva>", item, item);

        assert_eq!(
            parse_document("grande.xml", &xml, PeriodMode::Monthly),
            Err(StructuredError::Overflow)
        );

        let withholding = "<detalleCompras><detalleAir><codRetAir>303</codRetAir>\
                           <valRetAir>79228162514264337593543950335</valRetAir></detalleAir></detalleCompras>";
        let xml = format!("<iva><Anio>2024</Anio><Mes>01</Mes>{}{}</iva>", withholding, withholding);

        assert_eq!(
            parse_document("retenciones.xml", &xml, PeriodMode::Monthly),
            Err(StructuredError::Overflow)
        );
    }
}
