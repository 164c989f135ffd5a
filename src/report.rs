//! Slide-deck export of a filtered view.
//!
//! The deck is a minimal PresentationML package: one slide master, one blank
//! layout and a theme as fixed parts, plus generated slides. Slides are
//! written with `quick-xml` and packed with `zip`.

use std::{
    fs::File,
    io::{BufWriter, Seek, Write},
    path::Path,
};

use anyhow::{Context, Result, ensure};
use log::{debug, info};
use quick_xml::{
    Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::{
    breakdown::{REPORT_TOP_N, breakdown},
    cli::ReportArgs,
    data::format_thousands,
    frame::Frame,
    kpi::{KpiSet, sales_field},
    mapping::StandardField,
    session::Session,
};

pub const DECK_TITLE: &str = "MIS Dashboard Report";
const DECK_SUBTITLE: &str = "Generated by mis-dash";
const KPI_TITLE: &str = "Key Metrics";

const TABLE_SECTIONS: [(StandardField, &str); 3] = [
    (StandardField::Region, "Top Regions"),
    (StandardField::Product, "Top Products"),
    (StandardField::Channel, "Top Channels"),
];

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_PKG_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const CT_BASE: &str = "application/vnd.openxmlformats-officedocument";

// 4:3 slide, sizes in EMU.
const EMU_PER_INCH: i64 = 914_400;
const SLIDE_WIDTH: i64 = 9_144_000;
const SLIDE_HEIGHT: i64 = 6_858_000;
const ROW_HEIGHT: i64 = 370_840;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportDeck {
    pub title: String,
    pub subtitle: String,
    pub kpi_lines: Vec<String>,
    pub tables: Vec<ReportTable>,
}

impl ReportDeck {
    /// Title slide, KPI slide, then one slide per table.
    pub fn slide_count(&self) -> usize {
        2 + self.tables.len()
    }
}

/// Collects the deck content for a filtered view.
pub fn build_deck(view: &Frame) -> ReportDeck {
    let kpis = KpiSet::compute(view);
    let kpi_lines = vec![
        format!("Revenue: {}", format_thousands(kpis.revenue)),
        format!("Orders: {}", format_thousands(kpis.orders)),
        format!("Units: {}", format_thousands(kpis.units)),
        format!("GM %: {}", kpis.gm_percent_label()),
    ];
    let tables = match sales_field(view) {
        Some(metric) => TABLE_SECTIONS
            .into_iter()
            .filter_map(|(dimension, title)| {
                let aggregate = breakdown(view, dimension, metric, REPORT_TOP_N)?;
                Some(ReportTable {
                    title: title.to_string(),
                    headers: aggregate.headers(),
                    rows: aggregate.display_rows(),
                })
            })
            .collect(),
        None => Vec::new(),
    };
    ReportDeck {
        title: DECK_TITLE.to_string(),
        subtitle: DECK_SUBTITLE.to_string(),
        kpi_lines,
        tables,
    }
}

/// Writes `deck` as a `.pptx` package and hands the writer back.
pub fn write_pptx<W: Write + Seek>(deck: &ReportDeck, writer: W) -> Result<W> {
    let slide_count = deck.slide_count();
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(writer);

    let mut parts: Vec<(String, Vec<u8>)> = vec![
        ("[Content_Types].xml".into(), content_types_xml(slide_count)?),
        ("_rels/.rels".into(), ROOT_RELS.as_bytes().to_vec()),
        ("ppt/presentation.xml".into(), presentation_xml(slide_count)?),
        (
            "ppt/_rels/presentation.xml.rels".into(),
            presentation_rels_xml(slide_count)?,
        ),
        (
            "ppt/slideMasters/slideMaster1.xml".into(),
            SLIDE_MASTER.as_bytes().to_vec(),
        ),
        (
            "ppt/slideMasters/_rels/slideMaster1.xml.rels".into(),
            SLIDE_MASTER_RELS.as_bytes().to_vec(),
        ),
        (
            "ppt/slideLayouts/slideLayout1.xml".into(),
            SLIDE_LAYOUT.as_bytes().to_vec(),
        ),
        (
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels".into(),
            SLIDE_LAYOUT_RELS.as_bytes().to_vec(),
        ),
        ("ppt/theme/theme1.xml".into(), THEME.as_bytes().to_vec()),
    ];

    let mut slides = vec![title_slide(deck)?, kpi_slide(deck)?];
    for table in &deck.tables {
        slides.push(table_slide(table)?);
    }
    for (idx, slide) in slides.into_iter().enumerate() {
        let number = idx + 1;
        parts.push((format!("ppt/slides/slide{number}.xml"), slide));
        parts.push((
            format!("ppt/slides/_rels/slide{number}.xml.rels"),
            SLIDE_RELS.as_bytes().to_vec(),
        ));
    }

    for (name, bytes) in parts {
        debug!("Writing package part {name}");
        zip.start_file(name.as_str(), options)
            .with_context(|| format!("Starting package part {name}"))?;
        zip.write_all(&bytes)
            .with_context(|| format!("Writing package part {name}"))?;
    }
    let writer = zip.finish().context("Finalizing slide deck")?;
    Ok(writer)
}

pub fn save(deck: &ReportDeck, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Creating report {path:?}"))?;
    let mut writer = write_pptx(deck, BufWriter::new(file))?;
    writer
        .flush()
        .with_context(|| format!("Flushing report {path:?}"))?;
    Ok(())
}

pub fn execute(args: &ReportArgs) -> Result<()> {
    ensure!(
        args.output
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pptx")),
        "Report output must be a .pptx file, got {:?}",
        args.output
    );
    let session = Session::from_args(&args.data)?;
    let pass = session.render(&args.data.selection()?)?;
    let deck = build_deck(&pass.view);
    save(&deck, &args.output)?;
    info!(
        "Wrote {} slide(s) for {} row(s) to {:?}",
        deck.slide_count(),
        pass.view.len(),
        args.output
    );
    Ok(())
}

type Xml = Writer<Vec<u8>>;

fn xml_document() -> Result<Xml> {
    let mut xml = Writer::new(Vec::new());
    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    Ok(xml)
}

fn open(xml: &mut Xml, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
    xml.write_event(Event::Start(
        BytesStart::new(name).with_attributes(attrs.iter().copied()),
    ))?;
    Ok(())
}

fn close(xml: &mut Xml, name: &str) -> Result<()> {
    xml.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn empty(xml: &mut Xml, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
    xml.write_event(Event::Empty(
        BytesStart::new(name).with_attributes(attrs.iter().copied()),
    ))?;
    Ok(())
}

fn content_types_xml(slide_count: usize) -> Result<Vec<u8>> {
    let mut xml = xml_document()?;
    open(&mut xml, "Types", &[("xmlns", NS_CONTENT_TYPES)])?;
    empty(
        &mut xml,
        "Default",
        &[
            ("Extension", "rels"),
            ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
        ],
    )?;
    empty(
        &mut xml,
        "Default",
        &[("Extension", "xml"), ("ContentType", "application/xml")],
    )?;
    let mut overrides = vec![
        (
            "/ppt/presentation.xml".to_string(),
            format!("{CT_BASE}.presentationml.presentation.main+xml"),
        ),
        (
            "/ppt/slideMasters/slideMaster1.xml".to_string(),
            format!("{CT_BASE}.presentationml.slideMaster+xml"),
        ),
        (
            "/ppt/slideLayouts/slideLayout1.xml".to_string(),
            format!("{CT_BASE}.presentationml.slideLayout+xml"),
        ),
        (
            "/ppt/theme/theme1.xml".to_string(),
            format!("{CT_BASE}.theme+xml"),
        ),
    ];
    for number in 1..=slide_count {
        overrides.push((
            format!("/ppt/slides/slide{number}.xml"),
            format!("{CT_BASE}.presentationml.slide+xml"),
        ));
    }
    for (part, content_type) in &overrides {
        empty(
            &mut xml,
            "Override",
            &[("PartName", part.as_str()), ("ContentType", content_type.as_str())],
        )?;
    }
    close(&mut xml, "Types")?;
    Ok(xml.into_inner())
}

fn presentation_xml(slide_count: usize) -> Result<Vec<u8>> {
    let mut xml = xml_document()?;
    open(
        &mut xml,
        "p:presentation",
        &[("xmlns:a", NS_A), ("xmlns:r", NS_R), ("xmlns:p", NS_P)],
    )?;
    open(&mut xml, "p:sldMasterIdLst", &[])?;
    empty(
        &mut xml,
        "p:sldMasterId",
        &[("id", "2147483648"), ("r:id", "rId1")],
    )?;
    close(&mut xml, "p:sldMasterIdLst")?;
    open(&mut xml, "p:sldIdLst", &[])?;
    for number in 1..=slide_count {
        let id = (255 + number).to_string();
        let rel = format!("rId{}", number + 1);
        empty(&mut xml, "p:sldId", &[("id", id.as_str()), ("r:id", rel.as_str())])?;
    }
    close(&mut xml, "p:sldIdLst")?;
    let (cx, cy) = (SLIDE_WIDTH.to_string(), SLIDE_HEIGHT.to_string());
    empty(
        &mut xml,
        "p:sldSz",
        &[("cx", cx.as_str()), ("cy", cy.as_str()), ("type", "screen4x3")],
    )?;
    empty(&mut xml, "p:notesSz", &[("cx", cy.as_str()), ("cy", cx.as_str())])?;
    close(&mut xml, "p:presentation")?;
    Ok(xml.into_inner())
}

fn presentation_rels_xml(slide_count: usize) -> Result<Vec<u8>> {
    let mut xml = xml_document()?;
    open(&mut xml, "Relationships", &[("xmlns", NS_PKG_RELS)])?;
    let master_type = format!("{REL_BASE}/slideMaster");
    empty(
        &mut xml,
        "Relationship",
        &[
            ("Id", "rId1"),
            ("Type", master_type.as_str()),
            ("Target", "slideMasters/slideMaster1.xml"),
        ],
    )?;
    let slide_type = format!("{REL_BASE}/slide");
    for number in 1..=slide_count {
        let id = format!("rId{}", number + 1);
        let target = format!("slides/slide{number}.xml");
        empty(
            &mut xml,
            "Relationship",
            &[
                ("Id", id.as_str()),
                ("Type", slide_type.as_str()),
                ("Target", target.as_str()),
            ],
        )?;
    }
    let theme_id = format!("rId{}", slide_count + 2);
    let theme_type = format!("{REL_BASE}/theme");
    empty(
        &mut xml,
        "Relationship",
        &[
            ("Id", theme_id.as_str()),
            ("Type", theme_type.as_str()),
            ("Target", "theme/theme1.xml"),
        ],
    )?;
    close(&mut xml, "Relationships")?;
    Ok(xml.into_inner())
}

/// Builds one slide's shape tree. Shape ids start at 2; 1 is the group.
struct SlideBuilder {
    xml: Xml,
    next_id: usize,
}

#[derive(Clone, Copy)]
struct Placement {
    x: i64,
    y: i64,
    cx: i64,
    cy: i64,
}

impl Placement {
    fn inches(x: f64, y: f64, cx: f64, cy: f64) -> Self {
        let emu = |v: f64| (v * EMU_PER_INCH as f64).round() as i64;
        Self {
            x: emu(x),
            y: emu(y),
            cx: emu(cx),
            cy: emu(cy),
        }
    }
}

impl SlideBuilder {
    fn new() -> Result<Self> {
        let mut xml = xml_document()?;
        open(
            &mut xml,
            "p:sld",
            &[("xmlns:a", NS_A), ("xmlns:r", NS_R), ("xmlns:p", NS_P)],
        )?;
        open(&mut xml, "p:cSld", &[])?;
        open(&mut xml, "p:spTree", &[])?;
        open(&mut xml, "p:nvGrpSpPr", &[])?;
        empty(&mut xml, "p:cNvPr", &[("id", "1"), ("name", "")])?;
        empty(&mut xml, "p:cNvGrpSpPr", &[])?;
        empty(&mut xml, "p:nvPr", &[])?;
        close(&mut xml, "p:nvGrpSpPr")?;
        open(&mut xml, "p:grpSpPr", &[])?;
        open(&mut xml, "a:xfrm", &[])?;
        for tag in ["a:off", "a:chOff"] {
            empty(&mut xml, tag, &[("x", "0"), ("y", "0")])?;
        }
        for tag in ["a:ext", "a:chExt"] {
            empty(&mut xml, tag, &[("cx", "0"), ("cy", "0")])?;
        }
        close(&mut xml, "a:xfrm")?;
        close(&mut xml, "p:grpSpPr")?;
        Ok(Self { xml, next_id: 2 })
    }

    fn shape_id(&mut self) -> (String, usize) {
        let id = self.next_id;
        self.next_id += 1;
        (id.to_string(), id)
    }

    /// Text box with one paragraph per line.
    fn text_box(&mut self, frame: Placement, lines: &[String], size: u32, bold: bool) -> Result<()> {
        let (id, n) = self.shape_id();
        let name = format!("TextBox {}", n - 1);
        let xml = &mut self.xml;
        open(xml, "p:sp", &[])?;
        open(xml, "p:nvSpPr", &[])?;
        empty(xml, "p:cNvPr", &[("id", id.as_str()), ("name", name.as_str())])?;
        empty(xml, "p:cNvSpPr", &[("txBox", "1")])?;
        empty(xml, "p:nvPr", &[])?;
        close(xml, "p:nvSpPr")?;
        open(xml, "p:spPr", &[])?;
        write_xfrm(xml, "a:xfrm", frame)?;
        open(xml, "a:prstGeom", &[("prst", "rect")])?;
        empty(xml, "a:avLst", &[])?;
        close(xml, "a:prstGeom")?;
        empty(xml, "a:noFill", &[])?;
        close(xml, "p:spPr")?;
        open(xml, "p:txBody", &[])?;
        empty(xml, "a:bodyPr", &[("wrap", "square"), ("rtlCol", "0")])?;
        empty(xml, "a:lstStyle", &[])?;
        for line in lines {
            write_paragraph(xml, line, size, bold)?;
        }
        close(xml, "p:txBody")?;
        close(xml, "p:sp")
    }

    fn table(&mut self, frame: Placement, headers: &[String], rows: &[Vec<String>]) -> Result<()> {
        let (id, n) = self.shape_id();
        let name = format!("Table {}", n - 1);
        let columns = headers.len().max(1);
        let column_width = (frame.cx / columns as i64).to_string();
        let row_height = ROW_HEIGHT.to_string();
        let xml = &mut self.xml;
        open(xml, "p:graphicFrame", &[])?;
        open(xml, "p:nvGraphicFramePr", &[])?;
        empty(xml, "p:cNvPr", &[("id", id.as_str()), ("name", name.as_str())])?;
        open(xml, "p:cNvGraphicFramePr", &[])?;
        empty(xml, "a:graphicFrameLocks", &[("noGrp", "1")])?;
        close(xml, "p:cNvGraphicFramePr")?;
        empty(xml, "p:nvPr", &[])?;
        close(xml, "p:nvGraphicFramePr")?;
        write_xfrm(xml, "p:xfrm", frame)?;
        open(xml, "a:graphic", &[])?;
        open(
            xml,
            "a:graphicData",
            &[("uri", "http://schemas.openxmlformats.org/drawingml/2006/table")],
        )?;
        open(xml, "a:tbl", &[])?;
        empty(xml, "a:tblPr", &[("firstRow", "1"), ("bandRow", "1")])?;
        open(xml, "a:tblGrid", &[])?;
        for _ in 0..columns {
            empty(xml, "a:gridCol", &[("w", column_width.as_str())])?;
        }
        close(xml, "a:tblGrid")?;
        let header_row = std::iter::once((headers, true));
        let body_rows = rows.iter().map(|row| (row.as_slice(), false));
        for (cells, is_header) in header_row.chain(body_rows) {
            open(xml, "a:tr", &[("h", row_height.as_str())])?;
            for idx in 0..columns {
                let text = cells.get(idx).map(String::as_str).unwrap_or_default();
                open(xml, "a:tc", &[])?;
                open(xml, "a:txBody", &[])?;
                empty(xml, "a:bodyPr", &[])?;
                empty(xml, "a:lstStyle", &[])?;
                write_paragraph(xml, text, 1400, is_header)?;
                close(xml, "a:txBody")?;
                empty(xml, "a:tcPr", &[])?;
                close(xml, "a:tc")?;
            }
            close(xml, "a:tr")?;
        }
        close(xml, "a:tbl")?;
        close(xml, "a:graphicData")?;
        close(xml, "a:graphic")?;
        close(xml, "p:graphicFrame")
    }

    fn finish(mut self) -> Result<Vec<u8>> {
        close(&mut self.xml, "p:spTree")?;
        close(&mut self.xml, "p:cSld")?;
        open(&mut self.xml, "p:clrMapOvr", &[])?;
        empty(&mut self.xml, "a:masterClrMapping", &[])?;
        close(&mut self.xml, "p:clrMapOvr")?;
        close(&mut self.xml, "p:sld")?;
        Ok(self.xml.into_inner())
    }
}

fn write_xfrm(xml: &mut Xml, tag: &str, frame: Placement) -> Result<()> {
    let (x, y) = (frame.x.to_string(), frame.y.to_string());
    let (cx, cy) = (frame.cx.to_string(), frame.cy.to_string());
    open(xml, tag, &[])?;
    empty(xml, "a:off", &[("x", x.as_str()), ("y", y.as_str())])?;
    empty(xml, "a:ext", &[("cx", cx.as_str()), ("cy", cy.as_str())])?;
    close(xml, tag)
}

/// `size` is in hundredths of a point.
fn write_paragraph(xml: &mut Xml, text: &str, size: u32, bold: bool) -> Result<()> {
    let size = size.to_string();
    let bold = if bold { "1" } else { "0" };
    open(xml, "a:p", &[])?;
    open(xml, "a:r", &[])?;
    empty(
        xml,
        "a:rPr",
        &[("lang", "en-US"), ("sz", size.as_str()), ("b", bold), ("dirty", "0")],
    )?;
    open(xml, "a:t", &[])?;
    xml.write_event(Event::Text(BytesText::new(text)))?;
    close(xml, "a:t")?;
    close(xml, "a:r")?;
    close(xml, "a:p")
}

fn title_slide(deck: &ReportDeck) -> Result<Vec<u8>> {
    let mut slide = SlideBuilder::new()?;
    slide.text_box(
        Placement::inches(0.75, 2.5, 8.5, 1.25),
        std::slice::from_ref(&deck.title),
        4400,
        true,
    )?;
    slide.text_box(
        Placement::inches(0.75, 3.9, 8.5, 0.75),
        std::slice::from_ref(&deck.subtitle),
        2000,
        false,
    )?;
    slide.finish()
}

fn kpi_slide(deck: &ReportDeck) -> Result<Vec<u8>> {
    let mut slide = SlideBuilder::new()?;
    slide.text_box(
        Placement::inches(0.5, 0.4, 9.0, 0.9),
        &[KPI_TITLE.to_string()],
        3200,
        true,
    )?;
    slide.text_box(Placement::inches(0.5, 1.5, 9.0, 4.0), &deck.kpi_lines, 2400, false)?;
    slide.finish()
}

fn table_slide(table: &ReportTable) -> Result<Vec<u8>> {
    let mut slide = SlideBuilder::new()?;
    slide.text_box(
        Placement::inches(0.5, 0.4, 9.0, 0.9),
        std::slice::from_ref(&table.title),
        3200,
        true,
    )?;
    let mut frame = Placement::inches(0.5, 1.5, 9.0, 0.0);
    frame.cy = ROW_HEIGHT * (table.rows.len() as i64 + 1);
    slide.table(frame, &table.headers, &table.rows)?;
    slide.finish()
}

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#;

const SLIDE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/></Relationships>"#;

const SLIDE_MASTER_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="../theme/theme1.xml"/></Relationships>"#;

const SLIDE_LAYOUT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="../slideMasters/slideMaster1.xml"/></Relationships>"#;

const SLIDE_MASTER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr></p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst><p:txStyles><p:titleStyle><a:lvl1pPr><a:defRPr sz="4400"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill><a:latin typeface="+mj-lt"/></a:defRPr></a:lvl1pPr></p:titleStyle><p:bodyStyle><a:lvl1pPr><a:defRPr sz="2400"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill><a:latin typeface="+mn-lt"/></a:defRPr></a:lvl1pPr></p:bodyStyle><p:otherStyle><a:lvl1pPr><a:defRPr sz="1800"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill><a:latin typeface="+mn-lt"/></a:defRPr></a:lvl1pPr></p:otherStyle></p:txStyles></p:sldMaster>"#;

const SLIDE_LAYOUT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" type="blank" preserve="1"><p:cSld name="Blank"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr></p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#;

const THEME: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="mis-dash"><a:themeElements><a:clrScheme name="mis-dash"><a:dk1><a:srgbClr val="000000"/></a:dk1><a:lt1><a:srgbClr val="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="1F2937"/></a:dk2><a:lt2><a:srgbClr val="F3F4F6"/></a:lt2><a:accent1><a:srgbClr val="2563EB"/></a:accent1><a:accent2><a:srgbClr val="16A34A"/></a:accent2><a:accent3><a:srgbClr val="F59E0B"/></a:accent3><a:accent4><a:srgbClr val="DC2626"/></a:accent4><a:accent5><a:srgbClr val="7C3AED"/></a:accent5><a:accent6><a:srgbClr val="0891B2"/></a:accent6><a:hlink><a:srgbClr val="2563EB"/></a:hlink><a:folHlink><a:srgbClr val="7C3AED"/></a:folHlink></a:clrScheme><a:fontScheme name="mis-dash"><a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="mis-dash"><a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst><a:lnStyleLst><a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use std::io::{Cursor, Read};
    use zip::ZipArchive;

    fn text(s: &str) -> Option<Value> {
        Some(Value::Text(s.to_string()))
    }

    fn num(n: f64) -> Option<Value> {
        Some(Value::Number(n))
    }

    fn view() -> Frame {
        let mut rows = Vec::new();
        for (idx, region) in ["A", "B", "C", "D", "E", "F", "G"].iter().enumerate() {
            rows.push(vec![
                text(region),
                text("Online"),
                num(1.0),
                num(100.0 * (idx + 1) as f64),
                num(10.0 * (idx + 1) as f64),
            ]);
        }
        Frame::from_rows(
            vec![
                "region".into(),
                "channel".into(),
                "orders".into(),
                "revenue".into(),
                "cost".into(),
            ],
            rows,
        )
        .unwrap()
    }

    fn part(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
        let mut file = archive.by_name(name).unwrap();
        let mut body = String::new();
        file.read_to_string(&mut body).unwrap();
        body
    }

    #[test]
    fn deck_has_kpi_lines_and_top_five_tables() {
        let deck = build_deck(&view());
        assert_eq!(deck.title, DECK_TITLE);
        assert_eq!(
            deck.kpi_lines,
            vec!["Revenue: 2,800", "Orders: 7", "Units: 0", "GM %: 90.00%"]
        );
        let titles = deck.tables.iter().map(|t| t.title.as_str()).collect::<Vec<_>>();
        assert_eq!(titles, vec!["Top Regions", "Top Channels"]);
        assert_eq!(deck.tables[0].headers, vec!["region", "revenue"]);
        assert_eq!(deck.tables[0].rows.len(), REPORT_TOP_N);
        assert_eq!(deck.tables[0].rows[0], vec!["G".to_string(), "700".to_string()]);
        assert_eq!(deck.slide_count(), 4);
    }

    #[test]
    fn deck_without_cost_shows_placeholder() {
        let frame = Frame::from_rows(vec!["gmv".into()], vec![vec![num(5.0)]]).unwrap();
        let deck = build_deck(&frame);
        assert_eq!(deck.kpi_lines[3], "GM %: —");
        assert!(deck.tables.is_empty());
    }

    #[test]
    fn package_contains_every_slide() {
        let deck = build_deck(&view());
        let bytes = write_pptx(&deck, Cursor::new(Vec::new())).unwrap().into_inner();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

        let content_types = part(&mut archive, "[Content_Types].xml");
        assert!(content_types.contains("/ppt/slides/slide4.xml"));
        assert!(!content_types.contains("/ppt/slides/slide5.xml"));

        let presentation = part(&mut archive, "ppt/presentation.xml");
        assert_eq!(presentation.matches("<p:sldId ").count(), 4);

        let title = part(&mut archive, "ppt/slides/slide1.xml");
        assert!(title.contains("MIS Dashboard Report"));
        let kpis = part(&mut archive, "ppt/slides/slide2.xml");
        assert!(kpis.contains("GM %: 90.00%"));
        let regions = part(&mut archive, "ppt/slides/slide3.xml");
        assert!(regions.contains("Top Regions"));
        assert_eq!(regions.matches("<a:tr ").count(), REPORT_TOP_N + 1);
        assert!(archive.by_name("ppt/slides/_rels/slide4.xml.rels").is_ok());
    }

    #[test]
    fn text_is_escaped() {
        let deck = ReportDeck {
            title: "Sales & <Margin>".into(),
            subtitle: String::new(),
            kpi_lines: Vec::new(),
            tables: Vec::new(),
        };
        let bytes = write_pptx(&deck, Cursor::new(Vec::new())).unwrap().into_inner();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let title = part(&mut archive, "ppt/slides/slide1.xml");
        assert!(title.contains("Sales &amp; &lt;Margin&gt;"));
    }
}
