// ABOUTME: PPTX serialization module for the outline-deck application
// ABOUTME: Writes an in-memory deck as a PowerPoint package into a byte buffer

use crate::deck::{
    Deck, Paragraph, Picture, Rect, SLIDE_HEIGHT, SLIDE_WIDTH, Shape, Slide, TextBox,
};
use crate::errors::Result;
use crate::layout::TEXT_LANG;
use chrono;
use log::{debug, info};
use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use zip::{ZipWriter, write::FileOptions};

const NS_ATTRS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const REL_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const REL_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
const REL_THEME: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";

// Empty group transform every shape tree starts with
const SP_TREE_HEADER: &str = r#"<p:nvGrpSpPr>
                <p:cNvPr id="1" name=""/>
                <p:cNvGrpSpPr/>
                <p:nvPr/>
            </p:nvGrpSpPr>
            <p:grpSpPr>
                <a:xfrm>
                    <a:off x="0" y="0"/>
                    <a:ext cx="0" cy="0"/>
                    <a:chOff x="0" y="0"/>
                    <a:chExt cx="0" cy="0"/>
                </a:xfrm>
            </p:grpSpPr>"#;

const THEME_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme">
    <a:themeElements>
        <a:clrScheme name="Office">
            <a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>
            <a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>
            <a:dk2><a:srgbClr val="1F497D"/></a:dk2>
            <a:lt2><a:srgbClr val="EEECE1"/></a:lt2>
            <a:accent1><a:srgbClr val="4F81BD"/></a:accent1>
            <a:accent2><a:srgbClr val="C0504D"/></a:accent2>
            <a:accent3><a:srgbClr val="9BBB59"/></a:accent3>
            <a:accent4><a:srgbClr val="8064A2"/></a:accent4>
            <a:accent5><a:srgbClr val="4BACC6"/></a:accent5>
            <a:accent6><a:srgbClr val="F79646"/></a:accent6>
            <a:hlink><a:srgbClr val="0000FF"/></a:hlink>
            <a:folHlink><a:srgbClr val="800080"/></a:folHlink>
        </a:clrScheme>
        <a:fontScheme name="Office">
            <a:majorFont><a:latin typeface="Arial"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>
            <a:minorFont><a:latin typeface="Arial"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>
        </a:fontScheme>
        <a:fmtScheme name="Office">
            <a:fillStyleLst>
                <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
                <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
                <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
            </a:fillStyleLst>
            <a:lnStyleLst>
                <a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
                <a:ln w="25400"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
                <a:ln w="38100"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
            </a:lnStyleLst>
            <a:effectStyleLst>
                <a:effectStyle><a:effectLst/></a:effectStyle>
                <a:effectStyle><a:effectLst/></a:effectStyle>
                <a:effectStyle><a:effectLst/></a:effectStyle>
            </a:effectStyleLst>
            <a:bgFillStyleLst>
                <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
                <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
                <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
            </a:bgFillStyleLst>
        </a:fmtScheme>
    </a:themeElements>
    <a:objectDefaults/>
    <a:extraClrSchemeLst/>
</a:theme>"#;

/// Serialize `deck` into the bytes of a `.pptx` file.
pub fn write_pptx(deck: &Deck) -> Result<Vec<u8>> {
    let slides = deck.slides();
    info!("Serializing deck with {} slides", slides.len());

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    // Add [Content_Types].xml
    debug!("Creating PPTX structure: [Content_Types].xml");
    zip.start_file("[Content_Types].xml", FileOptions::default())?;
    let content_types = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="xml" ContentType="application/xml"/>
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="jpeg" ContentType="image/jpeg"/>
    <Default Extension="png" ContentType="image/png"/>
    <Default Extension="gif" ContentType="image/gif"/>
    <Default Extension="bmp" ContentType="image/bmp"/>
    <Default Extension="tiff" ContentType="image/tiff"/>
    <Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>
    <Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>
    <Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>
    <Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>
    <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
    <Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
    {slides}
</Types>"#,
        slides = (1..=slides.len())
            .map(|n| {
                format!(
                    r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
                    n
                )
            })
            .collect::<Vec<String>>()
            .join("\n    ")
    );
    zip.write_all(content_types.as_bytes())?;

    // Add _rels/.rels
    debug!("Creating PPTX structure: _rels/.rels");
    zip.start_file("_rels/.rels", FileOptions::default())?;
    let rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>
    <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
    <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#;
    zip.write_all(rels.as_bytes())?;

    // Add docProps/app.xml
    debug!("Creating PPTX structure: docProps/app.xml");
    zip.start_file("docProps/app.xml", FileOptions::default())?;
    let app_xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
    <Application>outline-deck</Application>
    <Slides>{}</Slides>
</Properties>"#,
        slides.len()
    );
    zip.write_all(app_xml.as_bytes())?;

    // Add docProps/core.xml
    debug!("Creating PPTX structure: docProps/core.xml");
    zip.start_file("docProps/core.xml", FileOptions::default())?;
    let core_xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
    <dc:title>{}</dc:title>
    <dc:creator>outline-deck</dc:creator>
    <dcterms:created xsi:type="dcterms:W3CDTF">{}</dcterms:created>
    <cp:revision>1</cp:revision>
</cp:coreProperties>"#,
        xml_text(deck.title()),
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
    );
    zip.write_all(core_xml.as_bytes())?;

    // Add ppt/_rels/presentation.xml.rels
    debug!("Creating PPTX structure: ppt/_rels/presentation.xml.rels");
    zip.start_file("ppt/_rels/presentation.xml.rels", FileOptions::default())?;
    let mut pres_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="{}" Target="slideMasters/slideMaster1.xml"/>
    <Relationship Id="rId2" Type="{}" Target="theme/theme1.xml"/>
"#,
        REL_MASTER, REL_THEME
    );
    // Slides start at rId3
    for n in 1..=slides.len() {
        pres_rels.push_str(&format!(
            r#"    <Relationship Id="rId{}" Type="{}" Target="slides/slide{}.xml"/>"#,
            n + 2,
            REL_SLIDE,
            n
        ));
        pres_rels.push('\n');
    }
    pres_rels.push_str("</Relationships>");
    zip.write_all(pres_rels.as_bytes())?;

    // Add ppt/presentation.xml
    debug!("Creating PPTX structure: ppt/presentation.xml");
    zip.start_file("ppt/presentation.xml", FileOptions::default())?;
    let presentation_xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation {ns}>
    <p:sldMasterIdLst>
        <p:sldMasterId id="2147483648" r:id="rId1"/>
    </p:sldMasterIdLst>
    <p:sldIdLst>
{slide_ids}
    </p:sldIdLst>
    <p:sldSz cx="{cx}" cy="{cy}" type="screen4x3"/>
    <p:notesSz cx="6858000" cy="9144000"/>
</p:presentation>"#,
        ns = NS_ATTRS,
        slide_ids = (1..=slides.len())
            .map(|n| format!(r#"        <p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 2))
            .collect::<Vec<String>>()
            .join("\n"),
        cx = SLIDE_WIDTH,
        cy = SLIDE_HEIGHT
    );
    zip.write_all(presentation_xml.as_bytes())?;

    // Add master, layout and theme shared by every slide
    debug!("Creating PPTX structure: slide master, layout and theme");
    zip.start_file("ppt/slideMasters/slideMaster1.xml", FileOptions::default())?;
    let master_xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster {ns}>
    <p:cSld>
        <p:bg>
            <p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef>
        </p:bg>
        <p:spTree>
            {header}
        </p:spTree>
    </p:cSld>
    <p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>
    <p:sldLayoutIdLst>
        <p:sldLayoutId id="2147483649" r:id="rId1"/>
    </p:sldLayoutIdLst>
</p:sldMaster>"#,
        ns = NS_ATTRS,
        header = SP_TREE_HEADER
    );
    zip.write_all(master_xml.as_bytes())?;

    zip.start_file(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        FileOptions::default(),
    )?;
    let master_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="{}" Target="../slideLayouts/slideLayout1.xml"/>
    <Relationship Id="rId2" Type="{}" Target="../theme/theme1.xml"/>
</Relationships>"#,
        REL_LAYOUT, REL_THEME
    );
    zip.write_all(master_rels.as_bytes())?;

    zip.start_file("ppt/slideLayouts/slideLayout1.xml", FileOptions::default())?;
    let layout_xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout {ns} type="blank" preserve="1">
    <p:cSld name="Blank">
        <p:spTree>
            {header}
        </p:spTree>
    </p:cSld>
    <p:clrMapOvr>
        <a:masterClrMapping/>
    </p:clrMapOvr>
</p:sldLayout>"#,
        ns = NS_ATTRS,
        header = SP_TREE_HEADER
    );
    zip.write_all(layout_xml.as_bytes())?;

    zip.start_file(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        FileOptions::default(),
    )?;
    let layout_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="{}" Target="../slideMasters/slideMaster1.xml"/>
</Relationships>"#,
        REL_MASTER
    );
    zip.write_all(layout_rels.as_bytes())?;

    zip.start_file("ppt/theme/theme1.xml", FileOptions::default())?;
    zip.write_all(THEME_XML.as_bytes())?;

    // Process each slide
    let mut media_count = 0;
    for (i, slide) in slides.iter().enumerate() {
        let slide_num = i + 1;
        debug!("Creating slide XML: ppt/slides/slide{}.xml", slide_num);

        // rId1 is the layout, pictures follow in shape order
        let mut slide_rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="{}" Target="../slideLayouts/slideLayout1.xml"/>
"#,
            REL_LAYOUT
        );
        for (j, picture) in slide.pictures().enumerate() {
            media_count += 1;
            let image_name = format!("image{}.{}", media_count, picture.image.extension());

            debug!("Adding image to PPTX: ppt/media/{}", image_name);
            zip.start_file(format!("ppt/media/{}", image_name), FileOptions::default())?;
            zip.write_all(picture.image.bytes())?;

            slide_rels.push_str(&format!(
                r#"    <Relationship Id="rId{}" Type="{}" Target="../media/{}"/>"#,
                j + 2,
                REL_IMAGE,
                image_name
            ));
            slide_rels.push('\n');
        }
        slide_rels.push_str("</Relationships>");

        zip.start_file(
            format!("ppt/slides/_rels/slide{}.xml.rels", slide_num),
            FileOptions::default(),
        )?;
        zip.write_all(slide_rels.as_bytes())?;

        zip.start_file(
            format!("ppt/slides/slide{}.xml", slide_num),
            FileOptions::default(),
        )?;
        zip.write_all(slide_xml(slide).as_bytes())?;
    }

    // Finalize the ZIP archive
    let cursor = zip.finish()?;
    let bytes = cursor.into_inner();
    info!("PPTX package assembled ({} bytes)", bytes.len());
    Ok(bytes)
}

/// Render the XML of one slide.
fn slide_xml(slide: &Slide) -> String {
    let mut shapes = String::new();
    let mut picture_rel = 1;

    // Shape id 1 is the group itself
    for (i, shape) in slide.shapes().iter().enumerate() {
        let id = i + 2;
        match shape {
            Shape::TextBox(text_box) => shapes.push_str(&text_box_xml(id, text_box)),
            Shape::Picture(picture) => {
                picture_rel += 1;
                shapes.push_str(&picture_xml(id, picture, picture_rel));
            }
        }
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld {ns}>
    <p:cSld>
        <p:spTree>
            {header}
{shapes}
        </p:spTree>
    </p:cSld>
    <p:clrMapOvr>
        <a:masterClrMapping/>
    </p:clrMapOvr>
</p:sld>"#,
        ns = NS_ATTRS,
        header = SP_TREE_HEADER,
        shapes = shapes
    )
}

fn xfrm_xml(frame: &Rect) -> String {
    format!(
        r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        frame.x, frame.y, frame.cx, frame.cy
    )
}

/// Escape text for XML, replacing characters XML 1.0 forbids with spaces.
fn xml_text(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| match c {
            '\t' | '\n' | '\r' => c,
            '\u{0}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}' => ' ',
            _ => c,
        })
        .collect();
    escape(&cleaned).into_owned()
}

fn paragraph_xml(paragraph: &Paragraph) -> String {
    let spacing = paragraph
        .space_after_pt
        .map(|pt| format!(r#"<a:pPr><a:spcAft><a:spcPts val="{}"/></a:spcAft></a:pPr>"#, pt * 100))
        .unwrap_or_default();
    format!(
        r#"<a:p>{spacing}<a:r><a:rPr lang="{lang}" sz="{size}" b="{bold}" dirty="0"><a:latin typeface="{face}"/></a:rPr><a:t>{text}</a:t></a:r></a:p>"#,
        spacing = spacing,
        lang = TEXT_LANG,
        size = paragraph.font.size_pt * 100,
        bold = if paragraph.font.bold { 1 } else { 0 },
        face = xml_text(&paragraph.font.typeface),
        text = xml_text(&paragraph.text)
    )
}

fn text_box_xml(id: usize, text_box: &TextBox) -> String {
    let paragraphs = if text_box.paragraphs.is_empty() {
        "<a:p/>".to_string()
    } else {
        text_box
            .paragraphs
            .iter()
            .map(paragraph_xml)
            .collect::<Vec<String>>()
            .join("")
    };

    format!(
        r#"            <p:sp>
                <p:nvSpPr>
                    <p:cNvPr id="{id}" name="{name}"/>
                    <p:cNvSpPr txBox="1"/>
                    <p:nvPr/>
                </p:nvSpPr>
                <p:spPr>
                    {xfrm}
                    <a:prstGeom prst="rect"><a:avLst/></a:prstGeom>
                    <a:noFill/>
                </p:spPr>
                <p:txBody>
                    <a:bodyPr wrap="{wrap}" rtlCol="0"><a:spAutoFit/></a:bodyPr>
                    <a:lstStyle/>
                    {paragraphs}
                </p:txBody>
            </p:sp>
"#,
        id = id,
        name = xml_text(&text_box.name),
        xfrm = xfrm_xml(&text_box.frame),
        wrap = if text_box.word_wrap { "square" } else { "none" },
        paragraphs = paragraphs
    )
}

fn picture_xml(id: usize, picture: &Picture, rel: usize) -> String {
    format!(
        r#"            <p:pic>
                <p:nvPicPr>
                    <p:cNvPr id="{id}" name="{name}"/>
                    <p:cNvPicPr>
                        <a:picLocks noChangeAspect="1"/>
                    </p:cNvPicPr>
                    <p:nvPr/>
                </p:nvPicPr>
                <p:blipFill>
                    <a:blip r:embed="rId{rel}"/>
                    <a:stretch>
                        <a:fillRect/>
                    </a:stretch>
                </p:blipFill>
                <p:spPr>
                    {xfrm}
                    <a:prstGeom prst="rect">
                        <a:avLst/>
                    </a:prstGeom>
                </p:spPr>
            </p:pic>
"#,
        id = id,
        name = xml_text(&picture.name),
        rel = rel,
        xfrm = xfrm_xml(&picture.frame)
    )
}
